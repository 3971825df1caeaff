//! JS adapters: a `DataSource` backed by a host object returning promises,
//! and a `GridPersistence` backed by plain callbacks.

use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Deserialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::datasource::{
    DataSource, GridPersistence, GroupPage, GroupQuery, GroupRecord, LocalFuture, RowQuery,
};
use crate::error::{GridError, Result};
use crate::types::{Row, RowValues};

/// Wire shape of one row coming back from `loadData`.
#[derive(Deserialize)]
struct WireRow {
    #[serde(rename = "rowIndex")]
    row_index: usize,
    #[serde(default)]
    data: RowValues,
}

/// Wire shape of the group-by response.
#[derive(Deserialize)]
struct WireGroupPage {
    list: Vec<WireGroup>,
    #[serde(rename = "pageInfo")]
    page_info: WirePageInfo,
}

#[derive(Deserialize)]
struct WireGroup {
    value: Option<String>,
    count: usize,
    #[serde(rename = "subGroupCount")]
    subgroup_count: Option<usize>,
}

#[derive(Deserialize)]
struct WirePageInfo {
    #[serde(rename = "totalRows")]
    total_rows: usize,
}

fn js_err(context: &str, value: &JsValue) -> GridError {
    let detail = value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"));
    GridError::DataSource(format!("{context}: {detail}"))
}

fn method(target: &Object, name: &str) -> Result<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(|e| js_err(name, &e))?
        .dyn_into::<Function>()
        .map_err(|_| GridError::DataSource(format!("data source has no `{name}` method")))
}

fn number(value: usize) -> JsValue {
    JsValue::from_f64(u32::try_from(value).map_or(f64::MAX, f64::from))
}

fn path_array(path: &[usize]) -> Array {
    path.iter().map(|&i| number(i)).collect()
}

async fn await_promise(value: JsValue, context: &str) -> Result<JsValue> {
    let promise: Promise = value
        .dyn_into()
        .map_err(|_| GridError::DataSource(format!("{context} did not return a promise")))?;
    JsFuture::from(promise)
        .await
        .map_err(|e| js_err(context, &e))
}

/// A remote data source living on the JS side of the boundary.
pub struct JsDataSource {
    target: Object,
}

impl JsDataSource {
    pub fn new(target: Object) -> Self {
        Self { target }
    }

    fn row_query_params(query: &RowQuery) -> Result<Object> {
        let params = Object::new();
        let set = |k: &str, v: &JsValue| {
            Reflect::set(&params, &JsValue::from_str(k), v).map_err(|e| js_err(k, &e))
        };
        set("offset", &number(query.offset))?;
        set("limit", &number(query.limit))?;
        if let Some(where_clause) = &query.where_clause {
            set("where", &JsValue::from_str(where_clause))?;
        }
        set("path", &path_array(&query.path))?;
        Ok(params)
    }
}

impl DataSource for JsDataSource {
    fn load_rows(&self, query: RowQuery, show_loading: bool) -> LocalFuture<'_, Result<Vec<Row>>> {
        Box::pin(async move {
            let func = method(&self.target, "loadData")?;
            let params = Self::row_query_params(&query)?;
            let promise = func
                .call2(&self.target, &params, &JsValue::from_bool(show_loading))
                .map_err(|e| js_err("loadData", &e))?;
            let value = await_promise(promise, "loadData").await?;
            let wire: Vec<WireRow> = serde_wasm_bindgen::from_value(value)
                .map_err(|e| GridError::DataSource(format!("loadData response: {e}")))?;
            Ok(wire
                .into_iter()
                .map(|w| {
                    let mut row = Row::new(w.row_index, w.data);
                    row.meta.path = query.path.clone();
                    row
                })
                .collect())
        })
    }

    fn load_groups(&self, query: GroupQuery) -> LocalFuture<'_, Result<GroupPage>> {
        Box::pin(async move {
            let func = method(&self.target, "loadGroups")?;
            let params = Object::new();
            let set = |k: &str, v: &JsValue| {
                Reflect::set(&params, &JsValue::from_str(k), v).map_err(|e| js_err(k, &e))
            };
            set("offset", &number(query.offset))?;
            set("limit", &number(query.limit))?;
            if let Some(where_clause) = &query.where_clause {
                set("where", &JsValue::from_str(where_clause))?;
            }
            set("sort", &JsValue::from_str(query.sort.as_param()))?;
            set("column_name", &JsValue::from_str(&query.column_name))?;
            if let Some(sub) = &query.sub_group_column_name {
                set("subGroupColumnName", &JsValue::from_str(sub))?;
            }
            let promise = func
                .call1(&self.target, &params)
                .map_err(|e| js_err("loadGroups", &e))?;
            let value = await_promise(promise, "loadGroups").await?;
            let wire: WireGroupPage = serde_wasm_bindgen::from_value(value)
                .map_err(|e| GridError::DataSource(format!("loadGroups response: {e}")))?;
            Ok(GroupPage {
                list: wire
                    .list
                    .into_iter()
                    .map(|g| GroupRecord {
                        value: g.value,
                        count: g.count,
                        subgroup_count: g.subgroup_count,
                    })
                    .collect(),
                total_groups: wire.page_info.total_rows,
            })
        })
    }

    fn related_display_column(&self, column_id: &str) -> LocalFuture<'_, Result<Option<String>>> {
        let column_id = column_id.to_string();
        Box::pin(async move {
            let func = method(&self.target, "relatedDisplayColumn")?;
            let promise = func
                .call1(&self.target, &JsValue::from_str(&column_id))
                .map_err(|e| js_err("relatedDisplayColumn", &e))?;
            let value = await_promise(promise, "relatedDisplayColumn").await?;
            Ok(value.as_string())
        })
    }

    fn move_row(
        &self,
        row_index: usize,
        before: Option<usize>,
        path: &[usize],
    ) -> LocalFuture<'_, Result<()>> {
        let path = path.to_vec();
        Box::pin(async move {
            let func = method(&self.target, "moveRow")?;
            let before = before.map_or(JsValue::NULL, number);
            let promise = func
                .call3(&self.target, &number(row_index), &before, &path_array(&path))
                .map_err(|e| js_err("moveRow", &e))?;
            await_promise(promise, "moveRow").await?;
            Ok(())
        })
    }
}

/// View-configuration persistence backed by host callbacks; individual
/// callbacks are optional and errors are swallowed.
pub struct JsPersistence {
    target: Object,
}

impl JsPersistence {
    pub fn new(target: Object) -> Self {
        Self { target }
    }

    fn call(&self, name: &str, args: &[JsValue]) {
        let Ok(func) = method(&self.target, name) else {
            return;
        };
        let array: Array = args.iter().collect();
        let _ = func.apply(&self.target, &array);
    }
}

impl GridPersistence for JsPersistence {
    fn on_resize(&self, column_id: &str, width_px: f64) {
        self.call(
            "onResize",
            &[JsValue::from_str(column_id), JsValue::from_f64(width_px)],
        );
    }

    fn on_resize_end(&self, column_id: &str, width_px: f64) {
        self.call(
            "onResizeEnd",
            &[JsValue::from_str(column_id), JsValue::from_f64(width_px)],
        );
    }

    fn on_column_order(&self, column_id: &str, order: f64) {
        self.call(
            "onColumnOrder",
            &[JsValue::from_str(column_id), JsValue::from_f64(order)],
        );
    }

    fn on_reload(&self) {
        self.call("onReload", &[]);
    }

    fn on_add_column(&self) {
        self.call("onAddColumn", &[]);
    }

    fn on_expand_row(&self, row_index: usize, path: &[usize]) {
        self.call(
            "onExpandRow",
            &[number(row_index), path_array(path).into()],
        );
    }
}
