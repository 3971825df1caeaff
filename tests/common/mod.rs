//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use gridview::datasource::{
    DataSource, GroupPage, GroupQuery, GroupRecord, LocalFuture, RowQuery,
};
use gridview::error::{GridError, Result};
use gridview::types::{ColumnType, GridColumn, Row, RowValues};

/// Polls ready-made futures to completion; the fakes never suspend.
pub fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    let mut cx = std::task::Context::from_waker(std::task::Waker::noop());
    let mut fut = std::pin::pin!(fut);
    loop {
        if let std::task::Poll::Ready(out) = fut.as_mut().poll(&mut cx) {
            return out;
        }
    }
}

/// Data source serving synthetic rows and a fixed two-level group tree,
/// recording every request it sees.
pub struct FakeSource {
    pub row_queries: RefCell<Vec<RowQuery>>,
    pub group_queries: RefCell<Vec<GroupQuery>>,
    pub fail_rows: bool,
    pub groups: Vec<GroupRecord>,
    pub related_display: Option<String>,
}

impl FakeSource {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            row_queries: RefCell::new(Vec::new()),
            group_queries: RefCell::new(Vec::new()),
            fail_rows: false,
            groups: Vec::new(),
            related_display: None,
        })
    }

    pub fn with_groups(groups: Vec<GroupRecord>) -> Rc<Self> {
        Rc::new(Self {
            row_queries: RefCell::new(Vec::new()),
            group_queries: RefCell::new(Vec::new()),
            fail_rows: false,
            groups,
            related_display: None,
        })
    }

    pub fn failing_rows() -> Rc<Self> {
        Rc::new(Self {
            row_queries: RefCell::new(Vec::new()),
            group_queries: RefCell::new(Vec::new()),
            fail_rows: true,
            groups: Vec::new(),
            related_display: None,
        })
    }
}

impl DataSource for FakeSource {
    fn load_rows(&self, query: RowQuery, _show_loading: bool) -> LocalFuture<'_, Result<Vec<Row>>> {
        self.row_queries.borrow_mut().push(query.clone());
        let out = if self.fail_rows {
            Err(GridError::DataSource("synthetic failure".to_string()))
        } else {
            Ok((query.offset..query.offset + query.limit)
                .map(|i| {
                    let mut values = RowValues::new();
                    values.insert("title".to_string(), serde_json::json!(format!("row {i}")));
                    Row::new(i, values)
                })
                .collect())
        };
        Box::pin(std::future::ready(out))
    }

    fn load_groups(&self, query: GroupQuery) -> LocalFuture<'_, Result<GroupPage>> {
        self.group_queries.borrow_mut().push(query.clone());
        let total = self.groups.len();
        let list = self
            .groups
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();
        Box::pin(std::future::ready(Ok(GroupPage {
            list,
            total_groups: total,
        })))
    }

    fn related_display_column(&self, _column_id: &str) -> LocalFuture<'_, Result<Option<String>>> {
        Box::pin(std::future::ready(Ok(self.related_display.clone())))
    }

    fn move_row(
        &self,
        _row_index: usize,
        _before: Option<usize>,
        _path: &[usize],
    ) -> LocalFuture<'_, Result<()>> {
        Box::pin(std::future::ready(Ok(())))
    }
}

pub fn column(id: &str, width: &str, fixed: bool, uidt: Option<ColumnType>) -> GridColumn {
    GridColumn {
        id: id.to_string(),
        title: id.to_string(),
        width: width.to_string(),
        uidt,
        fixed,
        primary: false,
        readonly: false,
        order: 0.0,
    }
}

pub fn text_columns(n: usize, width: &str) -> Vec<GridColumn> {
    (0..n)
        .map(|i| column(&format!("c{i}"), width, false, Some(ColumnType::SingleLineText)))
        .collect()
}
