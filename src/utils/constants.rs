//! Shared constants and defaults

pub const DEFAULT_TOKEN_VALIDITY_SECS: u64 = 10 * 60 * 60;
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 5 * 60;

pub const DEFAULT_MAX_CONCURRENCY: usize = 16;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_BATCH_DEADLINE_MS: u64 = 120_000;

pub const DEFAULT_STORE_KEY: &str = "apiToken";

pub const DEFAULT_LOGIN_PATH: &str = "/api/auth/login";
pub const DEFAULT_USERNAME_FIELD: &str = "username";
pub const DEFAULT_SECRET_FIELD: &str = "password";
/// Checked in order; first non-empty string wins.
pub const DEFAULT_TOKEN_FIELDS: [&str; 6] = [
    "token",
    "accessToken",
    "access_token",
    "data.token",
    "data.accessToken",
    "data.access_token",
];
/// Checked in order; first field present decides.
pub const DEFAULT_SUCCESS_FIELDS: [&str; 3] = ["success", "status", "ok"];

pub const DEFAULT_ORDER_PATH: &str = "/api/order/greenform/get";
pub const DEFAULT_ORDER_QUERY_PARAM: &str = "orderID";
pub const DEFAULT_TOKEN_HEADER: &str = "x-access-token";
