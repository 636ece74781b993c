//! ASOS hourly endpoint configuration
//!
//! Fixed query parameters of the `AsosHourlyInfoService/getWthrDataList`
//! operation. Everything that varies per request (station, dates, page) is
//! added by [`super::asos_http::AsosHttpClient`].

use std::time::Duration;

/// Production endpoint of the hourly ASOS service
pub const DEFAULT_BASE_URL: &str =
    "http://apis.data.go.kr/1360000/AsosHourlyInfoService/getWthrDataList";

/// Upper bound on a single request, including reading the body
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Rows per page. Larger pages make the gateway answer 504 on busy days.
pub const PAGE_SIZE: u32 = 50;

/// Configuration for the hourly ASOS operation
#[derive(Debug, Clone)]
pub struct AsosEndpointConfig {
    /// Data category code (`dataCd`)
    pub data_code: &'static str,
    /// Date category code (`dateCd`), `HR` for hourly
    pub date_code: &'static str,
    /// Response format (`dataType`)
    pub data_type: &'static str,
    /// First hour of each day (`startHh`)
    pub start_hour: &'static str,
    /// Last hour of each day (`endHh`)
    pub end_hour: &'static str,
    /// Rows per page (`numOfRows`)
    pub page_size: u32,
}

/// Hourly observations across the whole day, JSON encoded
pub const HOURLY_CONFIG: AsosEndpointConfig = AsosEndpointConfig {
    data_code: "ASOS",
    date_code: "HR",
    data_type: "JSON",
    start_hour: "00",
    end_hour: "23",
    page_size: PAGE_SIZE,
};

impl AsosEndpointConfig {
    /// Fixed query parameters shared by every request
    pub fn common_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dataCd", self.data_code.to_string()),
            ("dateCd", self.date_code.to_string()),
            ("dataType", self.data_type.to_string()),
            ("startHh", self.start_hour.to_string()),
            ("endHh", self.end_hour.to_string()),
            ("numOfRows", self.page_size.to_string()),
        ]
    }
}
