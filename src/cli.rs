use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::Parser;

use crate::clients::caldav_client::{CalendarRequest, CalendarSource, HttpCalendarSource};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::models::report::Report;
use crate::service::availability_service::AvailabilityService;
use crate::service::calendar_service::CalendarService;
use crate::service::report_service::{OutputFormat, ReportService};

const DEFAULT_REALM: &str = "Roundcube Calendar";
const DEFAULT_TIMEZONE: &str = "Australia/Melbourne";
const DEFAULT_BLOCK_MINUTES: i64 = 60;
const DEFAULT_RANGE_DAYS: i64 = 14;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FORMAT: &str = "json";

#[derive(Parser)]
#[command(about = "Compute free/busy time blocks from a CalDAV calendar.")]
struct Cli {
    /// URL of the CalDAV file on the server
    #[arg(long)]
    url: Option<String>,

    /// Username to access the CalDAV file
    #[arg(long)]
    username: Option<String>,

    /// Password to access the CalDAV file
    #[arg(long)]
    password: Option<String>,

    /// Authentication realm on the server
    #[arg(long)]
    realm: Option<String>,

    /// Start of the period to process, RFC 3339 or yyyy-mm-dd (default: now)
    #[arg(long)]
    start: Option<String>,

    /// End of the period to process, RFC 3339 or yyyy-mm-dd (default: start + 14 days)
    #[arg(long)]
    end: Option<String>,

    /// Length of each free/busy block in minutes
    #[arg(long)]
    block_minutes: Option<i64>,

    /// Local timezone for naive calendar timestamps and date arguments
    #[arg(long)]
    timezone: Option<String>,

    /// Fetch timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Output format: json, xml, or csv
    #[arg(long)]
    format: Option<String>,

    /// Output file path (default: availability.<format>)
    #[arg(long)]
    output: Option<PathBuf>,
}

// Everything the pipeline needs once flags, config file, and defaults
// have been merged.
#[derive(Debug)]
pub struct AvailabilityOptions {
    pub request: CalendarRequest,
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
    pub block_minutes: i64,
    pub timezone: Tz,
}

pub async fn cli(config: AppConfig) -> Result<()> {
    // Fine to panic here
    let cli = Cli::parse();
    let (options, format, output_path) = resolve_options(cli, &config)?;
    let source = HttpCalendarSource::new();
    let report = run_availability(&source, &options).await?;
    ReportService::write(&report, format, &output_path)?;
    println!(
        "Wrote {} blocks to {}",
        report.blocks.len(),
        output_path.display()
    );
    Ok(())
}

// Fetch, parse, aggregate. Writing is left to the caller so tests can
// inspect the report without touching the filesystem.
pub async fn run_availability(
    source: &dyn CalendarSource,
    options: &AvailabilityOptions,
) -> Result<Report> {
    let raw = source.fetch_calendar(&options.request).await?;
    let events = CalendarService::parse_events(
        &raw,
        options.timezone,
        options.range_start,
        options.range_end,
    )?;
    let blocks = AvailabilityService::aggregate(
        &events,
        options.range_start,
        options.range_end,
        options.block_minutes,
    );
    Ok(Report::new(&options.request.url, options.block_minutes, blocks))
}

fn resolve_options(
    cli: Cli,
    config: &AppConfig,
) -> Result<(AvailabilityOptions, OutputFormat, PathBuf)> {
    let url = cli
        .url
        .or_else(|| config.resolve("CALDAV_URL"))
        .ok_or_else(|| Error::InvalidArgument("missing --url (or CALDAV_URL)".to_string()))?;
    let username = cli
        .username
        .or_else(|| config.resolve("CALDAV_USERNAME"))
        .ok_or_else(|| {
            Error::InvalidArgument("missing --username (or CALDAV_USERNAME)".to_string())
        })?;
    let password = cli
        .password
        .or_else(|| config.resolve("CALDAV_PASSWORD"))
        .ok_or_else(|| {
            Error::InvalidArgument("missing --password (or CALDAV_PASSWORD)".to_string())
        })?;
    let realm = cli
        .realm
        .or_else(|| config.resolve("CALDAV_REALM"))
        .unwrap_or_else(|| DEFAULT_REALM.to_string());
    let timeout_secs = cli.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

    let tz_name = cli
        .timezone
        .or_else(|| config.resolve("TIMEZONE"))
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone: Tz = tz_name
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("unknown timezone \"{}\"", tz_name)))?;

    let range_start = match &cli.start {
        Some(value) => parse_range_bound(value, timezone)?,
        None => Utc::now(),
    };
    let range_end = match &cli.end {
        Some(value) => parse_range_bound(value, timezone)?,
        None => range_start + Duration::days(DEFAULT_RANGE_DAYS),
    };
    if range_start >= range_end {
        return Err(Error::InvalidArgument(
            "start must be before end".to_string(),
        ));
    }

    let block_minutes = cli.block_minutes.unwrap_or(DEFAULT_BLOCK_MINUTES);
    if block_minutes <= 0 {
        return Err(Error::InvalidArgument(
            "block size must be a positive number of minutes".to_string(),
        ));
    }

    let format: OutputFormat = cli
        .format
        .or_else(|| config.resolve("OUTPUT_FORMAT"))
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string())
        .parse()?;
    let output_path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(format!("availability.{}", format.extension())));

    let options = AvailabilityOptions {
        request: CalendarRequest {
            url,
            realm,
            username,
            password,
            timeout_secs,
        },
        range_start,
        range_end,
        block_minutes,
        timezone,
    };
    Ok((options, format, output_path))
}

// Accepts a full RFC 3339 timestamp or a bare date interpreted as local
// midnight in the configured timezone.
fn parse_range_bound(value: &str, timezone: Tz) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
            Error::InvalidArgument(format!("invalid date \"{}\"", value))
        })?;
        return chrono::TimeZone::from_local_datetime(&timezone, &midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("date {} does not exist in {}", value, timezone))
            });
    }
    Err(Error::InvalidArgument(format!(
        "cannot parse \"{}\" as RFC 3339 or yyyy-mm-dd",
        value
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rfc3339_bound_is_taken_verbatim() {
        let parsed = parse_range_bound("2017-03-01T09:00:00+11:00", chrono_tz::UTC).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2017, 2, 28, 22, 0, 0).unwrap());
    }

    #[test]
    fn bare_date_is_local_midnight() {
        let tz: Tz = "Australia/Melbourne".parse().unwrap();
        let parsed = parse_range_bound("2017-03-01", tz).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2017, 2, 28, 13, 0, 0).unwrap());
    }

    #[test]
    fn garbage_bound_is_rejected() {
        assert!(parse_range_bound("next tuesday", chrono_tz::UTC).is_err());
    }

    #[test]
    fn missing_url_is_invalid_argument() {
        let cli = Cli::parse_from(["caldavAvailability"]);
        let err = resolve_options(cli, &AppConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let cli = Cli::parse_from([
            "caldavAvailability",
            "--url",
            "https://cal.example.com/u.ics",
            "--username",
            "rod",
            "--password",
            "secret",
            "--block-minutes",
            "0",
        ]);
        let err = resolve_options(cli, &AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("block size"));
    }

    #[test]
    fn default_output_follows_format() {
        let cli = Cli::parse_from([
            "caldavAvailability",
            "--url",
            "https://cal.example.com/u.ics",
            "--username",
            "rod",
            "--password",
            "secret",
            "--format",
            "csv",
        ]);
        let (_, format, output) = resolve_options(cli, &AppConfig::default()).unwrap();
        assert_eq!(format, OutputFormat::Csv);
        assert_eq!(output, PathBuf::from("availability.csv"));
    }
}
