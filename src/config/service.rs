use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{env, fs};

use crate::auth::token::Credential;
use crate::config::{settings::SettingsConfig, store::StoreConfig};
use crate::utils::constants::{
    DEFAULT_LOGIN_PATH, DEFAULT_ORDER_PATH, DEFAULT_ORDER_QUERY_PARAM, DEFAULT_SECRET_FIELD,
    DEFAULT_SUCCESS_FIELDS, DEFAULT_TOKEN_FIELDS, DEFAULT_TOKEN_HEADER, DEFAULT_USERNAME_FIELD,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub remote: RemoteConfig,
    pub credential: CredentialConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// ================================
/// Remote order service
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub order: OrderConfig,
}

impl RemoteConfig {
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login.path)
    }

    pub fn order_url(&self) -> String {
        format!("{}{}", self.base_url, self.order.path)
    }
}

/// Login RPC. Deployments disagree on field names, so the response is
/// probed with ordered candidate lists (dotted paths into the JSON body).
#[derive(Debug, Deserialize, Clone)]
pub struct LoginConfig {
    #[serde(default = "default_login_path")]
    pub path: String,
    #[serde(default = "default_username_field")]
    pub username_field: String,
    #[serde(default = "default_secret_field")]
    pub secret_field: String,
    #[serde(default)]
    pub token_fields: Vec<String>,
    #[serde(default)]
    pub success_fields: Vec<String>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            path: default_login_path(),
            username_field: default_username_field(),
            secret_field: default_secret_field(),
            token_fields: default_token_fields(),
            success_fields: default_success_fields(),
        }
    }
}

/// Per-identifier lookup RPC
#[derive(Debug, Deserialize, Clone)]
pub struct OrderConfig {
    #[serde(default = "default_order_path")]
    pub path: String,
    #[serde(default = "default_order_query_param")]
    pub query_param: String,
    #[serde(default = "default_token_header")]
    pub token_header: String,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            path: default_order_path(),
            query_param: default_order_query_param(),
            token_header: default_token_header(),
        }
    }
}

/// ================================
/// Credential
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialConfig {
    pub username: GenericSourceValue,
    pub secret: GenericSourceValue,
}

impl CredentialConfig {
    /// Resolve both halves once, at startup.
    pub fn resolve(&self) -> Result<Credential> {
        let username = prepare_generic_source_value(&self.username).context("credential.username")?;
        let secret = prepare_generic_source_value(&self.secret).context("credential.secret")?;
        Ok(Credential::new(username, secret))
    }
}

/// Where a configured value comes from
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum GenericSourceValue {
    Literal {
        value: String,
    },
    FromEnv {
        from_env: String,
    },
    FromFile {
        path: String,
    },
}

pub fn prepare_generic_source_value(value: &GenericSourceValue) -> Result<String> {
    match value {
        GenericSourceValue::Literal { value } => Ok(value.to_owned()),
        GenericSourceValue::FromEnv { from_env } => {
            env::var(from_env).map_err(|err| anyhow!("env var '{}': {}", from_env, err))
        }
        GenericSourceValue::FromFile { path } => fs::read_to_string(path)
            .map_err(|err| anyhow!("file '{}': {}", path, err))
            .map(|res| res.trim().to_string()),
    }
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_username_field() -> String {
    DEFAULT_USERNAME_FIELD.to_string()
}

fn default_secret_field() -> String {
    DEFAULT_SECRET_FIELD.to_string()
}

pub fn default_token_fields() -> Vec<String> {
    DEFAULT_TOKEN_FIELDS.iter().map(|f| f.to_string()).collect()
}

pub fn default_success_fields() -> Vec<String> {
    DEFAULT_SUCCESS_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_order_path() -> String {
    DEFAULT_ORDER_PATH.to_string()
}

fn default_order_query_param() -> String {
    DEFAULT_ORDER_QUERY_PARAM.to_string()
}

fn default_token_header() -> String {
    DEFAULT_TOKEN_HEADER.to_string()
}
