use clap::{Parser, ValueEnum};

/// Alewife: live brewery batch status for tap displays.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log formatter to use
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    /// Services to run (defaults to all)
    #[arg(long = "service", value_enum)]
    pub services: Vec<ServiceName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable output for development
    Pretty,
    /// Structured JSON for production log collection
    Json,
}

/// Pretty in debug builds, JSON in release builds.
fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceName {
    /// HTTP API
    Web,
    /// Background batch cache refresh
    Refresh,
}

impl ServiceName {
    pub fn all() -> Vec<ServiceName> {
        vec![ServiceName::Web, ServiceName::Refresh]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Web => "web",
            ServiceName::Refresh => "refresh",
        }
    }
}

impl Args {
    /// Requested services, or every service when none were named.
    pub fn enabled_services(&self) -> Vec<ServiceName> {
        if self.services.is_empty() {
            ServiceName::all()
        } else {
            let mut services = Vec::with_capacity(self.services.len());
            for service in &self.services {
                if !services.contains(service) {
                    services.push(*service);
                }
            }
            services
        }
    }
}
