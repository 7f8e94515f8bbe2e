//! In-memory remote backend for dispatcher tests.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::remote::{RemoteBackend, RowQuery, Table};

#[derive(Default)]
struct FakeState {
  products: Vec<Value>,
  orders: Vec<Value>,
  next_id: u64,
  /// Every call fails while set
  down: bool,
  /// The next n calls fail
  fail_next: u32,
  calls: HashMap<&'static str, u32>,
}

impl FakeState {
  fn rows(&mut self, table: Table) -> &mut Vec<Value> {
    match table {
      Table::Products => &mut self.products,
      Table::Orders => &mut self.orders,
    }
  }

  fn enter(&mut self, op: &'static str) -> Result<()> {
    *self.calls.entry(op).or_default() += 1;
    if self.down {
      return Err(eyre!("{}: service unavailable", op));
    }
    if self.fail_next > 0 {
      self.fail_next -= 1;
      return Err(eyre!("{}: transient failure", op));
    }
    Ok(())
  }

  fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
  }

  /// Embed `products(name, price)` the way the real order listing does.
  fn joined(&self, table: Table, row: &Value) -> Value {
    let mut row = row.clone();
    if table == Table::Orders {
      let product = self
        .products
        .iter()
        .find(|p| p["id"] == row["product_id"])
        .map(|p| json!({ "name": p["name"], "price": p["price"] }))
        .unwrap_or(Value::Null);
      row["products"] = product;
    }
    row
  }
}

/// Remote backend double with snake_case rows and failure injection.
#[derive(Default)]
pub struct FakeRemote {
  state: Mutex<FakeState>,
}

fn matches(row: &Value, column: &str, expected: &str) -> bool {
  match &row[column] {
    Value::String(s) => s == expected,
    Value::Null => false,
    other => other.to_string() == expected,
  }
}

impl FakeRemote {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
    self.state.lock().unwrap()
  }

  pub fn set_down(&self, down: bool) {
    self.state().down = down;
  }

  pub fn fail_next(&self, count: u32) {
    self.state().fail_next = count;
  }

  pub fn calls(&self, op: &str) -> u32 {
    self.state().calls.get(op).copied().unwrap_or(0)
  }

  /// Insert a row directly, bypassing failure injection. Returns its id.
  pub fn seed(&self, table: Table, mut row: Value) -> String {
    let mut state = self.state();
    state.next_id += 1;
    let id = format!("r{}", state.next_id);
    let now = FakeState::timestamp();
    row["id"] = json!(id);
    row["created_at"] = json!(now);
    row["updated_at"] = json!(now);
    state.rows(table).push(row);
    id
  }

  pub fn row(&self, table: Table, id: &str) -> Option<Value> {
    self
      .state()
      .rows(table)
      .iter()
      .find(|r| r["id"] == id)
      .cloned()
  }

  pub fn count(&self, table: Table) -> usize {
    self.state().rows(table).len()
  }
}

#[async_trait]
impl RemoteBackend for FakeRemote {
  async fn select(&self, table: Table, query: &RowQuery) -> Result<Vec<Value>> {
    let mut state = self.state();
    state.enter("select")?;

    let mut rows: Vec<Value> = state
      .rows(table)
      .iter()
      .filter(|row| query.filters.iter().all(|(c, v)| matches(row, c, v)))
      .cloned()
      .collect();
    // Fixed-width timestamps sort lexicographically
    rows.sort_by(|a, b| {
      b["created_at"]
        .as_str()
        .unwrap_or("")
        .cmp(a["created_at"].as_str().unwrap_or(""))
    });

    let offset = query.offset.unwrap_or(0) as usize;
    let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
    Ok(
      rows
        .iter()
        .skip(offset)
        .take(limit)
        .map(|row| state.joined(table, row))
        .collect(),
    )
  }

  async fn select_one(&self, table: Table, id: &str) -> Result<Option<Value>> {
    let mut state = self.state();
    state.enter("select_one")?;
    let row = state.rows(table).iter().find(|r| r["id"] == id).cloned();
    Ok(row.map(|row| state.joined(table, &row)))
  }

  async fn insert(&self, table: Table, row: &Value) -> Result<Value> {
    self.state().enter("insert")?;
    let id = self.seed(table, row.clone());
    self
      .row(table, &id)
      .ok_or_else(|| eyre!("inserted row vanished"))
  }

  async fn update(&self, table: Table, id: &str, patch: &Value) -> Result<Option<Value>> {
    let mut state = self.state();
    state.enter("update")?;

    let Some(row) = state.rows(table).iter_mut().find(|r| r["id"] == id) else {
      return Ok(None);
    };
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
      for (key, value) in patch {
        row.insert(key.clone(), value.clone());
      }
      if !patch.contains_key("updated_at") {
        row.insert("updated_at".into(), json!(FakeState::timestamp()));
      }
    }
    Ok(Some(row.clone()))
  }

  async fn delete(&self, table: Table, id: &str) -> Result<()> {
    let mut state = self.state();
    state.enter("delete")?;
    state.rows(table).retain(|r| r["id"] != id);
    Ok(())
  }
}
