//! Measurement Protocol hit payloads.
//!
//! Parameters are kept in protocol order so the encoded body is stable:
//! `v, t, tid, cid` followed by the hit-specific fields.

use std::fmt;

/// Measurement Protocol version sent with every hit.
pub const PROTOCOL_VERSION: &str = "1";

/// Title reported for page views when the caller has none.
pub const UNKNOWN_TITLE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitType {
    PageView,
    Event,
}

impl HitType {
    pub fn as_str(self) -> &'static str {
        match self {
            HitType::PageView => "pageview",
            HitType::Event => "event",
        }
    }
}

impl fmt::Display for HitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storefront page view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    request_path: String,
    shop_domain: String,
    title: String,
}

impl PageView {
    pub fn new(request_path: impl Into<String>, shop_domain: impl Into<String>) -> Self {
        Self {
            request_path: request_path.into(),
            shop_domain: shop_domain.into(),
            title: UNKNOWN_TITLE.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn shop_domain(&self) -> &str {
        &self.shop_domain
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// A discrete event: category and action, plus optional label and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    category: String,
    action: String,
    label: String,
    value: i64,
}

impl Event {
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            label: String::new(),
            value: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

/// Ordered parameter list for one hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitParams {
    hit_type: HitType,
    params: Vec<(&'static str, String)>,
}

impl HitParams {
    fn base(hit_type: HitType, tracking_id: &str, client_id: &str) -> Self {
        Self {
            hit_type,
            params: vec![
                ("v", PROTOCOL_VERSION.to_string()),
                ("t", hit_type.as_str().to_string()),
                ("tid", tracking_id.to_string()),
                ("cid", client_id.to_string()),
            ],
        }
    }

    pub fn page_view(page: &PageView, tracking_id: &str, client_id: &str) -> Self {
        let mut hit = Self::base(HitType::PageView, tracking_id, client_id);
        hit.params.extend([
            ("dh", page.shop_domain().to_string()),
            ("dp", page.request_path().to_string()),
            ("dt", page.title().to_string()),
        ]);
        hit
    }

    pub fn event(event: &Event, tracking_id: &str, client_id: &str) -> Self {
        let mut hit = Self::base(HitType::Event, tracking_id, client_id);
        hit.params.extend([
            ("ec", event.category().to_string()),
            ("ea", event.action().to_string()),
            ("el", event.label().to_string()),
            ("ev", event.value().to_string()),
        ]);
        hit
    }

    pub fn hit_type(&self) -> HitType {
        self.hit_type
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Encode as an `application/x-www-form-urlencoded` body.
    pub fn to_form(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(&self.params)
    }
}
