//! Upstream call-sync API
//!
//! This module provides:
//! - Wire types for the PHP `calls.php` endpoint
//! - Pagination of a batch into form posts
//! - The HTTP uploader

mod client;

pub use client::{CallUploader, HttpUploader, endpoint_url};

use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::models::{CallLogEntry, DeviceConfig};
use crate::sync::timing::format_call_time;

/// Path of the call-sync endpoint, relative to the API base URL
pub const CALLS_ENDPOINT: &str = "api/lms/calls.php";

/// Value of the `action` form field for a batch upload
pub const SYNC_ACTION: &str = "sync_data";

/// One call as serialized into the `data` form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub device_number: String,
    pub call_type: String,
    pub caller_number: String,
    pub caller_name: String,
    /// Seconds, sent as a string
    pub duration: String,
    /// Device-local start time, `yyyy-MM-dd HH:mm:ss`
    pub time: String,
}

impl CallRecord {
    pub fn from_entry<Tz>(entry: &CallLogEntry, device_number: &str, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            device_number: device_number.to_string(),
            call_type: entry.call_type.as_str().to_string(),
            caller_number: entry.number.clone(),
            caller_name: entry.name.clone().unwrap_or_default(),
            duration: entry.duration_seconds.to_string(),
            time: format_call_time(entry.timestamp_millis, tz),
        }
    }
}

/// A single form post carrying one page of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPage {
    pub warehouse_id: String,
    pub device_id: String,
    pub device_number: String,
    pub records: Vec<CallRecord>,
    /// 1-based
    pub page_number: u32,
    pub total_pages: u32,
    pub records_per_page: u32,
}

impl UploadPage {
    /// Form fields in the order the endpoint documents them
    pub fn form_fields(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        Ok(vec![
            ("action", SYNC_ACTION.to_string()),
            ("wh_id", self.warehouse_id.clone()),
            ("device_id", self.device_id.clone()),
            ("register_device_number", self.device_number.clone()),
            ("data", serde_json::to_string(&self.records)?),
            ("page_number", self.page_number.to_string()),
            ("total_pages", self.total_pages.to_string()),
            ("records_per_page", self.records_per_page.to_string()),
        ])
    }
}

/// Split a batch into pages of at most `records_per_page` records.
///
/// An empty batch yields no pages.
pub fn paginate(
    config: &DeviceConfig,
    records: Vec<CallRecord>,
    records_per_page: usize,
) -> Vec<UploadPage> {
    let per_page = records_per_page.max(1);
    let total_pages = u32::try_from(records.len().div_ceil(per_page)).unwrap_or(u32::MAX);

    let mut pages = Vec::with_capacity(total_pages as usize);
    let mut remaining = records.into_iter().peekable();
    let mut page_number = 0;
    while remaining.peek().is_some() {
        page_number += 1;
        pages.push(UploadPage {
            warehouse_id: config.warehouse_id.clone(),
            device_id: config.device_id.clone(),
            device_number: config.mobile_number.clone(),
            records: remaining.by_ref().take(per_page).collect(),
            page_number,
            total_pages,
            records_per_page: u32::try_from(per_page).unwrap_or(u32::MAX),
        });
    }
    pages
}
