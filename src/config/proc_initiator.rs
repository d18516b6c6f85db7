use crate::config::service::{default_success_fields, default_token_fields, ServiceConfig};

/// Normalize what serde defaults cannot express: URL joins and empty lists.
pub fn initiate_default_values(mut config: ServiceConfig) -> ServiceConfig {
    let remote = &mut config.remote;
    remote.base_url = remote.base_url.trim().trim_end_matches('/').to_owned();
    remote.login.path = with_leading_slash(&remote.login.path);
    remote.order.path = with_leading_slash(&remote.order.path);

    // an explicit empty list means "use the defaults"
    if remote.login.token_fields.is_empty() {
        remote.login.token_fields = default_token_fields();
    }
    if remote.login.success_fields.is_empty() {
        remote.login.success_fields = default_success_fields();
    }

    config
}

fn with_leading_slash(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{}", path)
    }
}
