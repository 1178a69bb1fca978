use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camera_validator::accessor::{SoapRuleAccessor, WebApiAccessor};
use camera_validator::camera::{CameraClient, OnvifLifecycle};
use camera_validator::config::AppConfig;
use camera_validator::onvif::analytics::AnalyticsService;
use camera_validator::onvif::device::DeviceService;
use camera_validator::validator::{RunReport, Session, SuiteOptions, TamperSuite, Variant};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Soap,
    Web,
}

#[derive(Parser, Debug)]
#[command(name = "tamper-check")]
#[command(about = "Validates camera tamper settings over ONVIF or the web API")]
struct Args {
    /// Configuration file (YAML)
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/camera.yaml")]
    config: PathBuf,

    /// Which interface to drive
    #[arg(long, value_enum, default_value = "soap")]
    variant: VariantArg,

    /// Run the out-of-range and non-numeric write probes
    #[arg(long)]
    invalid_probes: bool,

    /// Also sweep the full timeout range (SOAP only; several thousand writes)
    #[arg(long)]
    timeout_range: bool,

    /// Write the run report here as YAML
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camera_validator=info,tamper_check=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(Args::parse()).await {
        Ok(report) if report.is_clean() => ExitCode::SUCCESS,
        Ok(report) => {
            if !report.passed {
                tracing::error!("{} of {} checks failed", report.fail_count, report.checks);
            }
            for error in &report.errors {
                tracing::error!("{}", error);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<RunReport> {
    let mut config = AppConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    config.suite.invalid_probes |= args.invalid_probes;
    config.suite.timeout_range |= args.timeout_range;

    let variant = match args.variant {
        VariantArg::Soap => Variant::Soap,
        VariantArg::Web => Variant::Web,
    };

    tracing::info!("Testing camera at {} ({:?})", config.camera.base_url(), variant);

    let camera = CameraClient::new(config.camera.clone())?;

    let info = DeviceService::get_device_information(&camera, &config.onvif.device_service)
        .await
        .context("Failed to query device information")?;
    tracing::info!(
        "Camera: {} {} firmware {} (hardware {})",
        info.manufacturer,
        info.model,
        info.firmware_version,
        info.hardware_id
    );

    let lifecycle = OnvifLifecycle::new(camera.clone(), config.onvif.device_service.clone(), config.lifecycle.clone());
    let options = SuiteOptions::from_config(variant, &config.suite);

    let report = match variant {
        Variant::Soap => {
            let analytics = AnalyticsService::new(camera.clone(), &config.onvif);
            let accessor = SoapRuleAccessor::new(analytics, &config.onvif.rule_name, &config.onvif.rule_type);
            let suite = TamperSuite::new(&config.suite.fixtures, options).with_rules(&accessor, accessor.rule_name());
            suite
                .run(Session::new(&accessor, &lifecycle), Some(info.hardware_id.as_str()))
                .await?
        }
        Variant::Web => {
            let accessor = WebApiAccessor::new(camera.clone(), &config.web);
            let suite = TamperSuite::new(&config.suite.fixtures, options);
            suite
                .run(Session::new(&accessor, &lifecycle), Some(info.hardware_id.as_str()))
                .await?
        }
    };

    if let Some(path) = &args.report {
        std::fs::write(path, report.to_yaml()?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    Ok(report)
}
