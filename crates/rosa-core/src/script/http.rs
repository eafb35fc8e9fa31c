//! The `http` table
//!
//! `get` and `post` queue a request for the worker and call back on a later
//! logic tick; the `Sync` variants block the calling thread.

use mlua::{Function, Lua, Table, Value};

use super::runtime;
use crate::network::{Headers, HttpResponse, Method};

fn headers(table: Table) -> mlua::Result<Headers> {
    table.pairs::<String, String>().collect()
}

/// `{status, body, headers}` for a response, `nil` when the request failed
pub fn response_value(lua: &Lua, response: Option<&HttpResponse>) -> mlua::Result<Value> {
    let Some(response) = response else {
        return Ok(Value::Nil);
    };
    let table = lua.create_table()?;
    table.set("status", response.status)?;
    table.set("body", response.body.as_str())?;
    let headers = lua.create_table()?;
    for (name, value) in &response.headers {
        headers.set(name.as_str(), value.as_str())?;
    }
    table.set("headers", headers)?;
    Ok(Value::Table(table))
}

fn post(body: String, content_type: String) -> Method {
    Method::Post { body, content_type }
}

fn enqueue(lua: &Lua, method: Method, scheme: &str, path: &str, headers: Headers, callback: Function) -> mlua::Result<()> {
    let rt = runtime(lua)?;
    let id = rt.network().enqueue(method, scheme, path, headers);
    rt.track_request(id, callback);
    Ok(())
}

pub fn install(lua: &Lua) -> mlua::Result<()> {
    let http = lua.create_table()?;
    http.set(
        "get",
        lua.create_function(
            |lua, (scheme, path, header_table, callback): (String, String, Table, Function)| {
                enqueue(lua, Method::Get, &scheme, &path, headers(header_table)?, callback)
            },
        )?,
    )?;
    http.set(
        "post",
        lua.create_function(
            |lua,
             (scheme, path, header_table, body, content_type, callback): (
                String,
                String,
                Table,
                String,
                String,
                Function,
            )| {
                let method = post(body, content_type);
                enqueue(lua, method, &scheme, &path, headers(header_table)?, callback)
            },
        )?,
    )?;
    http.set(
        "getSync",
        lua.create_function(|lua, (scheme, path, header_table): (String, String, Table)| {
            let response = runtime(lua)?.network().execute_now(
                Method::Get,
                &scheme,
                &path,
                headers(header_table)?,
            );
            response_value(lua, response.as_ref())
        })?,
    )?;
    http.set(
        "postSync",
        lua.create_function(
            |lua,
             (scheme, path, header_table, body, content_type): (
                String,
                String,
                Table,
                String,
                String,
            )| {
                let response = runtime(lua)?.network().execute_now(
                    post(body, content_type),
                    &scheme,
                    &path,
                    headers(header_table)?,
                );
                response_value(lua, response.as_ref())
            },
        )?,
    )?;
    lua.globals().set("http", http)
}
