use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use url::Url;

use super::{RemoteBackend, RowQuery, Table};
use crate::config::RemoteSettings;

/// PostgREST client for the hosted backend
#[derive(Clone)]
pub struct RestClient {
  http: reqwest::Client,
  /// `{service url}/rest/v1/`
  base: Url,
  key: String,
}

impl RestClient {
  pub fn new(settings: &RemoteSettings) -> Result<Self> {
    let mut url = settings.url.trim().to_string();
    if !url.ends_with('/') {
      url.push('/');
    }

    let base = Url::parse(&url)
      .and_then(|u| u.join("rest/v1/"))
      .map_err(|e| eyre!("Invalid remote URL {}: {}", settings.url, e))?;

    let http = reqwest::Client::builder()
      .gzip(true)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      key: settings.key.clone(),
    })
  }

  fn request(&self, method: Method, table: Table) -> Result<RequestBuilder> {
    let url = self
      .base
      .join(table.name())
      .map_err(|e| eyre!("Invalid table URL for {}: {}", table.name(), e))?;

    Ok(
      self
        .http
        .request(method, url)
        .header("apikey", &self.key)
        .bearer_auth(&self.key)
        .header("Accept", "application/json"),
    )
  }

  /// Send and decode the row array PostgREST answers with.
  async fn rows(&self, builder: RequestBuilder, what: &str) -> Result<Vec<Value>> {
    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", what, e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Failed to {}: HTTP {} {}", what, status, body));
    }

    response
      .json::<Vec<Value>>()
      .await
      .map_err(|e| eyre!("Failed to parse response to {}: {}", what, e))
  }
}

fn id_filter(id: &str) -> (&'static str, String) {
  ("id", format!("eq.{}", id))
}

#[async_trait]
impl RemoteBackend for RestClient {
  async fn select(&self, table: Table, query: &RowQuery) -> Result<Vec<Value>> {
    let mut params: Vec<(String, String)> = vec![
      ("select".into(), table.select_clause().into()),
      ("order".into(), "created_at.desc".into()),
    ];
    params.extend(
      query
        .filters
        .iter()
        .map(|(column, value)| (column.clone(), format!("eq.{}", value))),
    );
    if let Some(offset) = query.offset {
      params.push(("offset".into(), offset.to_string()));
    }
    if let Some(limit) = query.limit {
      params.push(("limit".into(), limit.to_string()));
    }

    let builder = self.request(Method::GET, table)?.query(&params);
    self.rows(builder, &format!("list {}", table.name())).await
  }

  async fn select_one(&self, table: Table, id: &str) -> Result<Option<Value>> {
    let builder = self
      .request(Method::GET, table)?
      .query(&[("select", table.select_clause())])
      .query(&[id_filter(id)])
      .query(&[("limit", "1")]);

    let rows = self
      .rows(builder, &format!("get {} {}", table.name(), id))
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn insert(&self, table: Table, row: &Value) -> Result<Value> {
    let builder = self
      .request(Method::POST, table)?
      .header("Prefer", "return=representation")
      .json(row);

    let what = format!("insert into {}", table.name());
    self
      .rows(builder, &what)
      .await?
      .into_iter()
      .next()
      .ok_or_else(|| eyre!("Failed to {}: no row returned", what))
  }

  async fn update(&self, table: Table, id: &str, patch: &Value) -> Result<Option<Value>> {
    let builder = self
      .request(Method::PATCH, table)?
      .header("Prefer", "return=representation")
      .query(&[id_filter(id)])
      .json(patch);

    let rows = self
      .rows(builder, &format!("update {} {}", table.name(), id))
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn delete(&self, table: Table, id: &str) -> Result<()> {
    let builder = self
      .request(Method::DELETE, table)?
      .header("Prefer", "return=representation")
      .query(&[id_filter(id)]);

    self
      .rows(builder, &format!("delete from {} {}", table.name(), id))
      .await?;
    Ok(())
  }
}
