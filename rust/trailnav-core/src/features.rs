//! Filtered, paginated search over features attached to nodes.

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::geodesy::haversine_m;
use crate::models::{BoundingBox, Feature, LonLat};
use crate::snapshot::GraphSnapshot;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// One composable restriction. A query keeps the features passing all of them.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureFilter {
    Category(String),
    /// Case-insensitive substring of name or description.
    Text(String),
    InBox(BoundingBox),
    WithinRadius { center: LonLat, radius_m: f64 },
}

impl FeatureFilter {
    fn matches(&self, feature: &Feature, position: LonLat) -> bool {
        match self {
            FeatureFilter::Category(c) => feature.category.eq_ignore_ascii_case(c),
            FeatureFilter::Text(needle) => {
                let needle = needle.to_lowercase();
                feature.name.to_lowercase().contains(&needle)
                    || feature.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            FeatureFilter::InBox(b) => b.contains(position),
            FeatureFilter::WithinRadius { center, radius_m } => haversine_m(*center, position) <= *radius_m,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureQuery {
    pub near: Option<LonLat>,
    pub radius_m: Option<f64>,
    pub bbox: Option<BoundingBox>,
    pub category: Option<String>,
    pub text: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for FeatureQuery {
    fn default() -> Self {
        Self { near: None, radius_m: None, bbox: None, category: None, text: None, page: 1, limit: DEFAULT_PAGE_LIMIT }
    }
}

impl FeatureQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn near(mut self, point: LonLat) -> Self {
        self.near = Some(point);
        self
    }

    pub fn within_radius(mut self, meters: f64) -> Self {
        self.radius_m = Some(meters);
        self
    }

    pub fn in_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matching(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn validate(&self, max_limit: u32) -> NavResult<()> {
        if self.page < 1 {
            return Err(NavError::invalid("page must be >= 1"));
        }
        if self.limit < 1 || self.limit > max_limit {
            return Err(NavError::invalid(format!("limit must be between 1 and {}", max_limit)));
        }
        if let Some(p) = self.near {
            p.validate()?;
        }
        if let Some(b) = &self.bbox {
            b.validate()?;
        }
        if let Some(r) = self.radius_m {
            if !r.is_finite() || r < 0.0 {
                return Err(NavError::invalid("radius_m must be a non-negative number"));
            }
            if self.near.is_none() {
                return Err(NavError::invalid("radius_m requires a reference point"));
            }
        }
        Ok(())
    }

    /// Blank category/text values impose no restriction.
    pub fn filters(&self) -> Vec<FeatureFilter> {
        let mut out = Vec::new();
        if let (Some(center), Some(radius_m)) = (self.near, self.radius_m) {
            out.push(FeatureFilter::WithinRadius { center, radius_m });
        }
        if let Some(b) = self.bbox {
            out.push(FeatureFilter::InBox(b));
        }
        if let Some(c) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            out.push(FeatureFilter::Category(c.to_string()));
        }
        if let Some(t) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            out.push(FeatureFilter::Text(t.to_string()));
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    /// Rejects a page past the last one; an empty result still has one page.
    pub fn new(page: u32, limit: u32, total_items: u64) -> NavResult<Self> {
        if page < 1 || limit < 1 {
            return Err(NavError::invalid("page and limit must be >= 1"));
        }
        let total_pages = total_items.div_ceil(u64::from(limit)).max(1);
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
        if page > total_pages {
            return Err(NavError::invalid(format!("page {} is beyond the last page {}", page, total_pages)));
        }
        Ok(Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        })
    }

    pub fn offset(&self) -> usize {
        (self.current_page as usize - 1) * self.items_per_page as usize
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureHit {
    #[serde(flatten)]
    pub feature: Feature,
    pub position: LonLat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

/// Sorted by distance (then id) when the query has a reference point, else by id.
pub fn search_features(snapshot: &GraphSnapshot, query: &FeatureQuery, max_limit: u32) -> NavResult<Page<FeatureHit>> {
    query.validate(max_limit)?;
    let filters = query.filters();
    let spatial = snapshot.spatial();

    // Narrow by the spatial filters first; the predicate pass re-checks everything.
    let candidate_nodes: Option<Vec<u32>> = match (query.near, query.radius_m, query.bbox) {
        (Some(center), Some(r), _) => Some(spatial.nodes_within(center, r).into_iter().map(|h| h.node).collect()),
        (_, _, Some(b)) => Some(spatial.nodes_in_bbox(&b)),
        _ => None,
    };
    let candidates: Vec<u32> = match candidate_nodes {
        Some(nodes) => nodes.iter().flat_map(|&n| snapshot.features_at(n).iter().copied()).collect(),
        None => (0..snapshot.features().len() as u32).collect(),
    };

    let mut hits: Vec<FeatureHit> = candidates
        .into_iter()
        .filter_map(|fi| {
            let feature = snapshot.feature(fi);
            let node = snapshot.node_idx(feature.node_id)?;
            let position = snapshot.node(node).position;
            if !filters.iter().all(|f| f.matches(feature, position)) {
                return None;
            }
            Some(FeatureHit {
                feature: feature.clone(),
                position,
                distance_m: query.near.map(|c| haversine_m(c, position)),
            })
        })
        .collect();

    if query.near.is_some() {
        hits.sort_by(|a, b| {
            let (da, db) = (a.distance_m.unwrap_or(f64::INFINITY), b.distance_m.unwrap_or(f64::INFINITY));
            da.total_cmp(&db).then(a.feature.id.cmp(&b.feature.id))
        });
    } else {
        hits.sort_by_key(|h| h.feature.id);
    }

    let pagination = Pagination::new(query.page, query.limit, hits.len() as u64)?;
    let items = hits.into_iter().skip(pagination.offset()).take(query.limit as usize).collect();
    Ok(Page { items, pagination })
}
