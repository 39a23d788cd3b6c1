//! Purpose: Fabric (logical database) management passthroughs.
//! Exports: `Fabrics`, `FabricOptions`.
//! Role: Thin wrapper; fabric administration always targets the system fabric.
//! Invariants: Admin paths carry `/_fabric/_system/` so they bypass the current fabric.
#![allow(clippy::result_large_err)]

use super::connection::{Connection, DEFAULT_FABRIC};
use super::{api_path, unwrap_result};
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::request::LogicalRequest;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricOptions {
    /// Regions (data centers) the fabric spans; empty means all.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dc_list: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_dc: Option<String>,
}

#[derive(Serialize)]
struct CreateFabricRequest<'a> {
    name: &'a str,
    options: &'a FabricOptions,
}

pub struct Fabrics<'a> {
    conn: &'a Connection,
}

impl Connection {
    pub fn fabrics(&self) -> Fabrics<'_> {
        Fabrics { conn: self }
    }
}

impl Fabrics<'_> {
    pub fn list(&self) -> ApiResult<Vec<String>> {
        let value = self.conn.call(&LogicalRequest::get(system_path(&["database"])))?;
        let names = unwrap_result(value);
        serde_json::from_value(names).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("fabric list is not an array of names")
                .with_source(err)
        })
    }

    /// Properties of the connection's current fabric.
    pub fn current(&self) -> ApiResult<Value> {
        let value = self
            .conn
            .call(&LogicalRequest::get(api_path(&["database", "current"])))?;
        Ok(unwrap_result(value))
    }

    pub fn create(&self, name: &str, options: &FabricOptions) -> ApiResult<()> {
        let request = LogicalRequest::post(system_path(&["database"]))
            .with_json(&CreateFabricRequest { name, options })?;
        self.conn.call(&request)?;
        Ok(())
    }

    pub fn delete(&self, name: &str) -> ApiResult<()> {
        self.conn
            .call(&LogicalRequest::delete(system_path(&["database", name])))?;
        Ok(())
    }
}

fn system_path(segments: &[&str]) -> String {
    format!("/_fabric/{DEFAULT_FABRIC}/_api{}", api_path(segments))
}

#[cfg(test)]
mod tests {
    use super::{FabricOptions, system_path};

    #[test]
    fn system_paths_carry_fabric_marker() {
        assert_eq!(
            system_path(&["database", "geo eu"]),
            "/_fabric/_system/_api/database/geo%20eu"
        );
    }

    #[test]
    fn options_omit_empty_fields() {
        let json = serde_json::to_value(FabricOptions::default()).expect("json");
        assert_eq!(json, serde_json::json!({}));
        let json = serde_json::to_value(FabricOptions {
            dc_list: vec!["eu-west".to_string()],
            spot_dc: Some("eu-west".to_string()),
        })
        .expect("json");
        assert_eq!(json["dcList"][0], "eu-west");
        assert_eq!(json["spotDc"], "eu-west");
    }
}
