use anyhow::{Context, Result};
use maplit::hashmap;
use std::fmt;
use strfmt::strfmt;

use crate::tile::Tile;

/// IGN Géoportail WMTS GetTile request, in the "PM" (Web-Mercator) tile matrix set.
pub const IGN_WMTS_URL: &str = "https://wxs.ign.fr/{api_key}/geoportail/wmts?SERVICE=WMTS&VERSION=1.0.0&REQUEST=GetTile&STYLE=normal&LAYER={layer}&EXCEPTIONS=text/xml&FORMAT=image/jpeg&TILEMATRIXSET=PM&TILEMATRIX={zoom}&TILEROW={row}&TILECOL={col}&";

/// A tile URL template with the replacement specifiers `{api_key}`, `{layer}`,
/// `{zoom}`, `{row}` and `{col}`.
#[derive(Clone, PartialEq)]
pub struct UrlFormat {
    format_str: String,
    api_key: String,
}

impl UrlFormat {
    pub fn new(format_str: String, api_key: String) -> Self {
        Self {
            format_str,
            api_key,
        }
    }

    pub fn tile_url(&self, layer: &str, tile: &Tile) -> Result<String> {
        let vars = hashmap! {
            "api_key".to_owned() => self.api_key.clone(),
            "layer".to_owned() => layer.to_owned(),
            "zoom".to_owned() => tile.zoom.to_string(),
            "row".to_owned() => tile.row.to_string(),
            "col".to_owned() => tile.col.to_string(),
        };

        strfmt(&self.format_str, &vars).context("failed formatting URL")
    }
}

impl fmt::Debug for UrlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlFormat")
            .field("format_str", &self.format_str)
            .finish()
    }
}
