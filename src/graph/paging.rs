//! Cursor pagination over a Graph edge.
//!
//! Each response either carries `paging.cursors.after` (there is another
//! page) or it does not (done). [`PageState::after`] is the whole transition
//! function; [`GraphClient::fetch_all`] just drives it.

use serde_json::Value;

use super::{GraphClient, GraphError, QueryParams};

/// One decoded page: its items plus the cursor for the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub items: Vec<Value>,
    pub next_cursor: Option<String>,
}

impl PageResult {
    /// Split a raw response. A missing or non-array `data` is an empty page.
    pub fn from_response(mut response: Value) -> Self {
        let next_cursor = match PageState::after(&response) {
            PageState::HasNext(cursor) => Some(cursor),
            PageState::Done => None,
        };
        let items = match response.get_mut("data").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        Self { items, next_cursor }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    HasNext(String),
    Done,
}

impl PageState {
    /// Next state given the last response. Empty responses and missing or
    /// empty cursors are terminal.
    pub fn after(response: &Value) -> Self {
        if is_empty_response(response) {
            return PageState::Done;
        }
        match response
            .pointer("/paging/cursors/after")
            .and_then(Value::as_str)
        {
            Some(cursor) if !cursor.is_empty() => PageState::HasNext(cursor.to_string()),
            _ => PageState::Done,
        }
    }
}

fn is_empty_response(response: &Value) -> bool {
    match response {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}

impl GraphClient {
    /// Drain every page of `edge_path` into one list, in arrival order.
    ///
    /// Errors from any page abort the whole fetch; items gathered so far are
    /// dropped. Stops early, with a warning, once `max_pages` is reached.
    pub async fn fetch_all(
        &self,
        edge_path: &str,
        mut params: QueryParams,
    ) -> Result<Vec<Value>, GraphError> {
        let first = PageResult::from_response(self.get(edge_path, &params).await?);
        let mut items = first.items;
        let mut state = match first.next_cursor {
            Some(cursor) => PageState::HasNext(cursor),
            None => PageState::Done,
        };
        let mut pages: u32 = 1;

        while let PageState::HasNext(cursor) = state {
            if self.max_pages.is_some_and(|max| pages >= max) {
                tracing::warn!(
                    edge = edge_path,
                    pages,
                    "Page limit reached, stopping with {} items",
                    items.len()
                );
                break;
            }
            params.insert("after".to_string(), cursor);
            let page = PageResult::from_response(self.get(edge_path, &params).await?);
            pages += 1;
            tracing::debug!(
                edge = edge_path,
                page = pages,
                count = page.items.len(),
                "Fetched page"
            );
            items.extend(page.items);
            state = match page.next_cursor {
                Some(cursor) => PageState::HasNext(cursor),
                None => PageState::Done,
            };
        }

        tracing::debug!(edge = edge_path, pages, total = items.len(), "Pagination done");
        Ok(items)
    }
}
