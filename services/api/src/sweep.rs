use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
use clap::Args;

use crate::infra::{seed_catalog, InMemoryAdoptionStore, LogEmailSender, LogPushChannel};
use homeward::config::AppConfig;
use homeward::error::AppError;
use homeward::telemetry;
use homeward::workflows::adoption::{
    Actor, AdoptionService, ApplicationIntake, ExpirationSweeper, StatusChange,
};

#[derive(Args, Debug, Default)]
pub(crate) struct SweepArgs {
    /// Sweep date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

/// One offline sweep pass over a seeded in-memory world: an application is
/// driven to the visit-request stage with its deadline landing on the sweep
/// date, then expired. Useful for demos and for eyeballing the log output.
pub(crate) fn run_sweep(args: SweepArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    let store = Arc::new(InMemoryAdoptionStore::default());
    seed_catalog(&store);
    let service = Arc::new(AdoptionService::new(
        store,
        Arc::new(LogEmailSender),
        Arc::new(LogPushChannel),
        config.scheduling,
    ));

    // Backdate the intake so the home-visit deadline falls on the sweep date.
    let requested_on = date - Duration::days(config.scheduling.home_visit_deadline_days);
    let requested_at = Utc.from_utc_datetime(
        &requested_on
            .and_hms_opt(9, 0, 0)
            .expect("9am is a valid time"),
    );

    let application = service.create_application_at(
        ApplicationIntake {
            shelter_id: "shl-001".to_string(),
            microchip_id: "chip-9001".to_string(),
            applicant_email: "casey@example.com".to_string(),
        },
        requested_at,
    )?;
    service.update_status_at(
        &application.id,
        StatusChange::HomeVisitRequested,
        &Actor::shelter("team@cedarvalley.example"),
        requested_at,
    )?;

    let sweeper = ExpirationSweeper::new(service.clone());
    let expired = sweeper.run_once(date)?;

    println!("Expiration sweep for {date}");
    println!("- {expired} application(s) expired");
    let after = service.get_application(&application.id)?;
    println!(
        "- {} is now '{}'",
        after.id.0,
        after.status.label()
    );

    Ok(())
}
