use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub site_url: String,
    pub server_port: u16,
    pub http_timeout_seconds: u64,
    pub default_tax_rate: f64,
    pub booking: BookingSettings,
}

/// How a confirmed booking treats more than one selected slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiSlotPolicy {
    /// Only the first selected slot becomes an appointment.
    FirstSlot,
    /// Every selected slot becomes its own appointment.
    EachSlot,
}

impl FromStr for MultiSlotPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" | "first_slot" => Ok(MultiSlotPolicy::FirstSlot),
            "each" | "each_slot" => Ok(MultiSlotPolicy::EachSlot),
            other => Err(format!("unknown multi-slot policy: {}", other)),
        }
    }
}

/// Longest booking window accepted from the environment.
pub const MAX_HORIZON_DAYS: u32 = 366;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSettings {
    pub availability_ratio: f64,
    pub lab_max_selections: usize,
    pub single_max_selections: usize,
    pub horizon_days: u32,
    pub multi_slot_policy: MultiSlotPolicy,
    pub default_address: String,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            availability_ratio: 0.7,
            lab_max_selections: 3,
            single_max_selections: 1,
            horizon_days: 7,
            multi_slot_policy: MultiSlotPolicy::FirstSlot,
            default_address: "123 Rue Principale, Ville".to_string(),
        }
    }
}

impl BookingSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let availability_ratio = parse_var("BOOKING_SLOT_AVAILABILITY", defaults.availability_ratio);
        let availability_ratio = if (0.0..=1.0).contains(&availability_ratio) {
            availability_ratio
        } else {
            warn!("BOOKING_SLOT_AVAILABILITY must be within 0..=1, using {}", defaults.availability_ratio);
            defaults.availability_ratio
        };

        let horizon_days = parse_var("BOOKING_HORIZON_DAYS", defaults.horizon_days).max(1);
        let horizon_days = if horizon_days > MAX_HORIZON_DAYS {
            warn!("BOOKING_HORIZON_DAYS capped at {} (got {})", MAX_HORIZON_DAYS, horizon_days);
            MAX_HORIZON_DAYS
        } else {
            horizon_days
        };

        Self {
            availability_ratio,
            lab_max_selections: parse_var("BOOKING_LAB_MAX_SLOTS", defaults.lab_max_selections).max(1),
            single_max_selections: parse_var("BOOKING_SINGLE_MAX_SLOTS", defaults.single_max_selections).max(1),
            horizon_days,
            multi_slot_policy: parse_var("BOOKING_MULTI_SLOT_POLICY", defaults.multi_slot_policy),
            default_address: env::var("BOOKING_DEFAULT_ADDRESS")
                .unwrap_or(defaults.default_address),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            site_url: env::var("SITE_URL")
                .unwrap_or_else(|_| {
                    warn!("SITE_URL not set, using default");
                    "http://localhost:5173".to_string()
                }),
            server_port: parse_var("SERVER_PORT", 3000),
            http_timeout_seconds: parse_var("HTTP_TIMEOUT_SECONDS", 15),
            default_tax_rate: parse_var("INVOICE_DEFAULT_TAX_RATE", 20.0),
            booking: BookingSettings::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Where auth e-mails (confirmation, password reset) send the user back to.
    pub fn auth_redirect_url(&self) -> String {
        format!("{}/login", self.site_url.trim_end_matches('/'))
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
