use anyhow::{anyhow, bail, Context, Result};
use geojson::feature::Id;
use geojson::{Feature as GeoFeature, FeatureCollection, GeoJson, Value};
use serde_json::Value as JsonValue;
use tracing::debug;

use trailnav_core::geodesy::polyline_length_m;
use trailnav_core::models::DEFAULT_EDGE_CATEGORY;
use trailnav_core::{Edge, Feature, GraphData, Node, Position};

/// `properties.id`, falling back to a numeric top-level feature id.
fn item_id(item: &GeoFeature) -> Result<i64> {
    if let Some(id) = item.property("id").and_then(JsonValue::as_i64) {
        return Ok(id);
    }
    match &item.id {
        Some(Id::Number(n)) => n.as_i64().ok_or_else(|| anyhow!("feature id must be an integer")),
        _ => bail!("property 'id' must be an integer"),
    }
}

fn req_i64(item: &GeoFeature, key: &str) -> Result<i64> {
    item.property(key)
        .and_then(JsonValue::as_i64)
        .ok_or_else(|| anyhow!("property '{}' must be an integer", key))
}

fn opt_f64(item: &GeoFeature, key: &str) -> Result<Option<f64>> {
    match item.property(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| anyhow!("property '{}' must be a number", key)),
    }
}

fn opt_str(item: &GeoFeature, key: &str) -> Option<String> {
    item.property(key).and_then(JsonValue::as_str).map(str::to_string)
}

fn req_str(item: &GeoFeature, key: &str) -> Result<String> {
    opt_str(item, key).ok_or_else(|| anyhow!("property '{}' must be a string", key))
}

fn geometry_value(item: &GeoFeature) -> Result<&Value> {
    item.geometry.as_ref().map(|g| &g.value).ok_or_else(|| anyhow!("missing geometry"))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn parse_node(item: &GeoFeature) -> Result<Node> {
    let Value::Point(raw) = geometry_value(item)? else {
        bail!("node geometry must be a Point, got {}", kind_name(geometry_value(item)?));
    };
    let p = Position::from_slice(raw)?;
    let mut node = Node::new(item_id(item)?, p.lon, p.lat);
    node.name = opt_str(item, "name");
    // An explicit altitude property wins over a third coordinate.
    node.altitude = opt_f64(item, "altitude")?.or(p.alt);
    Ok(node)
}

fn parse_feature(item: &GeoFeature) -> Result<Feature> {
    Ok(Feature {
        id: item_id(item)?,
        node_id: req_i64(item, "node_id")?,
        category: req_str(item, "category")?,
        name: req_str(item, "name")?,
        description: opt_str(item, "description"),
        rating: opt_f64(item, "rating")?,
    })
}

fn parse_edge(item: &GeoFeature) -> Result<Edge> {
    let Value::LineString(raw) = geometry_value(item)? else {
        bail!("edge geometry must be a LineString, got {}", kind_name(geometry_value(item)?));
    };
    let coords = raw.iter().map(|c| Position::from_slice(c)).collect::<Result<Vec<_>, _>>()?;
    let cost = match opt_f64(item, "cost")? {
        Some(c) => c,
        None => polyline_length_m(&coords),
    };
    let oneway = item.property("oneway").and_then(JsonValue::as_bool).unwrap_or(false);
    let reverse_cost = if oneway { None } else { Some(opt_f64(item, "reverse_cost")?.unwrap_or(cost)) };
    let category = opt_str(item, "category").unwrap_or_else(|| DEFAULT_EDGE_CATEGORY.to_string());
    Ok(Edge::new(item_id(item)?, req_i64(item, "source")?, req_i64(item, "target")?, cost)
        .with_reverse_cost(reverse_cost)
        .with_geometry(coords)
        .with_category(category))
}

/// Reads a GeoJSON FeatureCollection whose features carry a `kind` property of
/// `node`, `feature` or `edge`. Other kinds are skipped.
pub fn parse_feature_collection(text: &str) -> Result<GraphData> {
    let doc: GeoJson = text.parse().context("input is not valid GeoJSON")?;
    let collection = FeatureCollection::try_from(doc).context("top-level object must be a FeatureCollection")?;

    let mut data = GraphData::default();
    let mut skipped = 0usize;
    for (i, item) in collection.features.iter().enumerate() {
        let kind = item.property("kind").and_then(JsonValue::as_str).unwrap_or("");
        let parsed = match kind {
            "node" => parse_node(item).map(|n| data.nodes.push(n)),
            "feature" => parse_feature(item).map(|f| data.features.push(f)),
            "edge" => parse_edge(item).map(|e| data.edges.push(e)),
            _ => {
                skipped += 1;
                Ok(())
            }
        };
        parsed.with_context(|| format!("feature #{} (kind '{}')", i, kind))?;
    }
    debug!(
        nodes = data.nodes.len(),
        edges = data.edges.len(),
        features = data.features.len(),
        skipped,
        "parsed geojson"
    );
    Ok(data)
}
