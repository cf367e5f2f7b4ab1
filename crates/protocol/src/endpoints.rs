//! Paths and hosts of the open API.
//!
//! Relative paths are joined onto the API base by the gateway.

pub const API_BASE: &str = "https://pan.baidu.com";
pub const TOKEN_URL: &str = "https://openapi.baidu.com/oauth/2.0/token";
/// Host locator for block transfer. Lives on a different host than the API base.
pub const LOCATE_UPLOAD_URL: &str = "https://d.pcs.baidu.com/rest/2.0/pcs/file";

pub const FILE: &str = "/rest/2.0/xpan/file";
pub const MULTIMEDIA: &str = "/rest/2.0/xpan/multimedia";
pub const NAS: &str = "/rest/2.0/xpan/nas";
pub const QUOTA: &str = "/api/quota";
/// Appended to the located transfer host.
pub const SUPERFILE: &str = "/rest/2.0/pcs/superfile2";

/// Application id the locate endpoint expects.
pub const LOCATE_APP_ID: &str = "250528";
pub const UPLOAD_VERSION: &str = "2.0";
