//! CLI definition and dispatch.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, error, info, warn};

use crate::adapters::csv_adapter::{read_order_fills, read_symbol_export};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::google_auth::{ServiceAccountTokens, SheetsToken};
use crate::adapters::json_session_store::JsonSessionStore;
use crate::adapters::kite_adapter::{self, KiteAdapter};
use crate::adapters::kite_login::KiteWebLogin;
use crate::adapters::sentinel_adapter::{self, SentinelAdapter};
use crate::adapters::sheets_adapter::{self, GoogleSheetsAdapter};
use crate::domain::alert::{AdvancedTrigger, clear_triggers, ideas_to_triggers};
use crate::domain::error::TradeDeskError;
use crate::domain::idea::{EntryRange, Side, TradeIdea, WatchlistKind};
use crate::domain::rule_text::format_number;
use crate::domain::session::Authenticator;
use crate::domain::sheet::{append_rows, records};
use crate::domain::symbols::join_symbols;
use crate::domain::trade_log::{Fill, PositionBook, RoundTrip, reconstruct};
use crate::domain::trendline::{self, Crossing, SessionStart, TrendLine, TriggerRule};
use crate::ports::alert_port::{AlertPort, CreatedTrigger};
use crate::ports::config_port::ConfigPort;
use crate::ports::sheet_port::SheetPort;
use crate::ports::watchlist_port::WatchlistPort;

pub const DEFAULT_CONFIG: &str = "tradedesk.ini";
pub const DEFAULT_MARGIN_PCT: f64 = 0.3;
pub const CREDENTIALS_FILE_VAR: &str = "CREDENTIAL_JSON_PATH";

#[derive(Parser, Debug)]
#[command(name = "tradedesk", about = "Watchlists, price alerts and trade logs for a Kite account")]
pub struct Cli {
    /// INI configuration file (defaults to ./tradedesk.ini when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a trend line into an alert rule and register it
    Trendline {
        #[arg(short, long)]
        symbol: String,
        /// Price at the start, price at the second point, minutes to it
        #[arg(long, required = true, num_args = 3, value_names = ["Y1", "Y2", "X2"], allow_negative_numbers = true)]
        coords: Vec<f64>,
        /// Day of year, hour and minute the line starts at
        #[arg(long, required = true, num_args = 3, value_names = ["DAY", "HOUR", "MIN"])]
        start: Vec<u32>,
        /// Fire when the price drops below the line
        #[arg(long)]
        down: bool,
        /// Delete every existing trigger first
        #[arg(long)]
        clear: bool,
        /// Print the rule without registering it
        #[arg(long)]
        dry_run: bool,
    },
    /// Log a trade idea, watch the symbol and set a near-price alert
    Idea {
        #[arg(short, long)]
        symbol: String,
        /// Entry price or range, e.g. 1500-1510
        #[arg(short, long)]
        entry: EntryRange,
        #[arg(long = "type", default_value = "Long")]
        side: Side,
        /// Planned exit
        #[arg(long = "ex", default_value_t = 0.0)]
        exit: f64,
        #[arg(long = "sl", default_value_t = 0.0)]
        stop_loss: f64,
        /// Alert margin in percent of the entry (falls back to [idea] margin_pct, then 0.3)
        #[arg(short, long)]
        margin: Option<f64>,
        /// Largest acceptable loss, used to size the position
        #[arg(long = "mloss", default_value_t = 0.0)]
        max_loss: f64,
        /// Empty the watchlist before adding the symbol
        #[arg(long)]
        clear: bool,
        /// Delete triggers that already fired
        #[arg(long)]
        clear_triggers: bool,
        /// Delete every trigger
        #[arg(long)]
        clear_triggers_all: bool,
        #[arg(long)]
        no_sheet: bool,
        #[arg(long)]
        no_alert: bool,
        #[arg(long)]
        no_watch: bool,
        #[arg(long)]
        swing: bool,
        #[arg(long)]
        long_term: bool,
        #[arg(long)]
        waitlist: bool,
    },
    /// Create entry triggers for every idea in the ideas worksheet
    SyncIdeas,
    /// Rebuild round trips from an order export and log them
    TradeLog {
        orders: PathBuf,
        #[arg(long)]
        no_sheet: bool,
    },
    /// Print a screener export as a chart symbol list
    TvSymbols { export: PathBuf },
    /// List alert triggers
    Triggers,
    /// Log in again and store the new session
    Login {
        #[arg(value_enum)]
        service: Service,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Service {
    Kite,
    Sentinel,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Trendline {
            symbol,
            coords,
            start,
            down,
            clear,
            dry_run,
        } => run_trendline(&config, &symbol, &coords, &start, down, clear, dry_run),
        Command::Idea {
            symbol,
            entry,
            side,
            exit,
            stop_loss,
            margin,
            max_loss,
            clear,
            clear_triggers,
            clear_triggers_all,
            no_sheet,
            no_alert,
            no_watch,
            swing,
            long_term,
            waitlist,
        } => {
            let margin = idea_margin(&config, margin);
            let idea = TradeIdea::new(&symbol, side, entry, exit, stop_loss, margin, max_loss)?;
            let options = IdeaOptions {
                sheet: !no_sheet,
                watch: !no_watch,
                alert: !no_alert,
                clear_watchlist: clear,
                clear_triggers: clear_triggers || clear_triggers_all,
                clear_all_triggers: clear_triggers_all,
                watchlist: WatchlistKind::select(swing, long_term, waitlist),
            };
            run_idea(&config, &idea, &options)
        }
        Command::SyncIdeas => run_sync_ideas(&config),
        Command::TradeLog { orders, no_sheet } => run_trade_log(&config, &orders, no_sheet),
        Command::TvSymbols { export } => {
            let symbols = read_symbol_export(&export)?;
            info!(count = symbols.len(), "symbols converted");
            println!("{}", join_symbols(&symbols));
            Ok(())
        }
        Command::Triggers => run_triggers(&config),
        Command::Login { service } => run_login(&config, service),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

/// The file named on the command line, else `tradedesk.ini` when it exists,
/// else built-in defaults only.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, TradeDeskError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None if Path::new(DEFAULT_CONFIG).exists() => PathBuf::from(DEFAULT_CONFIG),
        None => {
            debug!("no configuration file, using defaults");
            return Ok(FileConfigAdapter::empty());
        }
    };
    debug!(path = %path.display(), "loading configuration");
    FileConfigAdapter::from_file(&path).map_err(|e| TradeDeskError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn kite_url(config: &dyn ConfigPort) -> String {
    config.get_string_or("kite", "base_url", kite_adapter::DEFAULT_BASE_URL)
}

fn sentinel_url(config: &dyn ConfigPort) -> String {
    config
        .get_string_or("sentinel", "base_url", sentinel_adapter::DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string()
}

pub fn kite_auth(config: &dyn ConfigPort) -> Authenticator {
    let store = JsonSessionStore::new(config.get_string_or(
        "kite",
        "session_file",
        "auth_data/kite_session.json",
    ));
    let login = KiteWebLogin::new("kite", &kite_url(config))
        .with_twofa_type(&config.get_string_or("kite", "twofa_type", "pin"));
    Authenticator::new("kite", Box::new(store), Box::new(login))
}

/// The alert service signs in through the broker: after the broker login its
/// own login page completes the handshake and sets the service's cookies.
pub fn sentinel_auth(config: &dyn ConfigPort) -> Authenticator {
    let base = sentinel_url(config);
    let store = JsonSessionStore::new(config.get_string_or(
        "sentinel",
        "session_file",
        "auth_data/sentinel_session.json",
    ));
    let login = KiteWebLogin::new("sentinel", &kite_url(config))
        .with_twofa_type(&config.get_string_or("kite", "twofa_type", "pin"))
        .with_follow_up(
            &format!("{base}/user/login/kite"),
            &format!("{base}/triggers/all"),
        );
    Authenticator::new("sentinel", Box::new(store), Box::new(login))
}

pub fn kite_client(config: &dyn ConfigPort) -> Result<KiteAdapter, TradeDeskError> {
    KiteAdapter::new(
        &kite_url(config),
        &config.get_string_or("kite", "version", kite_adapter::DEFAULT_KITE_VERSION),
        kite_auth(config),
    )
}

pub fn sentinel_client(config: &dyn ConfigPort) -> Result<SentinelAdapter, TradeDeskError> {
    SentinelAdapter::new(&sentinel_url(config), sentinel_auth(config))
}

pub fn sheets_client(config: &dyn ConfigPort) -> Result<GoogleSheetsAdapter, TradeDeskError> {
    let spreadsheet_id = config
        .get_string("sheets", "spreadsheet_id")
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| TradeDeskError::ConfigMissing {
            section: "sheets".into(),
            key: "spreadsheet_id".into(),
        })?;
    GoogleSheetsAdapter::with_token_source(
        &config.get_string_or("sheets", "base_url", sheets_adapter::DEFAULT_BASE_URL),
        &spreadsheet_id,
        sheets_token(config)?,
    )
}

/// A service-account key file (`[sheets] credentials_file`, else
/// `$CREDENTIAL_JSON_PATH`) when one is configured, else a ready-made bearer
/// token from the variable named by `[sheets] token_env`.
pub fn sheets_token(config: &dyn ConfigPort) -> Result<SheetsToken, TradeDeskError> {
    let key_file = config
        .get_string("sheets", "credentials_file")
        .or_else(|| std::env::var(CREDENTIALS_FILE_VAR).ok())
        .filter(|v| !v.trim().is_empty());
    if let Some(path) = key_file {
        let tokens = ServiceAccountTokens::from_file(Path::new(&path))?;
        info!(account = %tokens.client_email(), "using service account for sheets");
        return Ok(tokens.into());
    }
    let token_var = config.get_string_or("sheets", "token_env", "GOOGLE_SHEETS_TOKEN");
    let token = std::env::var(&token_var)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(TradeDeskError::CredentialMissing { var: token_var })?;
    Ok(SheetsToken::Static(token))
}

/// Near-price alert margin: the command line wins over `[idea] margin_pct`.
pub fn idea_margin(config: &dyn ConfigPort, flag: Option<f64>) -> f64 {
    flag.unwrap_or_else(|| config.get_double("idea", "margin_pct", DEFAULT_MARGIN_PCT))
}

fn ideas_worksheet(config: &dyn ConfigPort) -> String {
    config.get_string_or("sheets", "ideas_worksheet", "Ideas")
}

fn trades_worksheet(config: &dyn ConfigPort) -> String {
    config.get_string_or("sheets", "trades_worksheet", "DT Trades")
}

pub fn watchlist_name(config: &dyn ConfigPort, kind: WatchlistKind) -> String {
    let (key, default) = kind.config_key();
    config.get_string_or("watchlists", key, default)
}

pub fn compile_trendline(
    symbol: &str,
    coords: &[f64],
    start: &[u32],
    down: bool,
) -> Result<TriggerRule, TradeDeskError> {
    let [y1, y2, x2] = coords else {
        return Err(TradeDeskError::invalid("--coords takes Y1 Y2 X2"));
    };
    let [day, hour, minute] = start else {
        return Err(TradeDeskError::invalid("--start takes DAY HOUR MIN"));
    };
    let crossing = if down { Crossing::Below } else { Crossing::Above };
    trendline::compile(
        symbol,
        &TrendLine::new(*y1, *y2, *x2),
        SessionStart {
            day: *day,
            hour: *hour,
            minute: *minute,
        },
        crossing,
    )
}

/// Register a compiled trend line, optionally wiping existing triggers first.
pub fn register_trendline(
    alerts: &dyn AlertPort,
    rule: TriggerRule,
    clear: bool,
) -> Result<CreatedTrigger, TradeDeskError> {
    if clear {
        clear_triggers(alerts, true)?;
    }
    alerts.create_advanced(&AdvancedTrigger::from(rule))
}

fn run_trendline(
    config: &dyn ConfigPort,
    symbol: &str,
    coords: &[f64],
    start: &[u32],
    down: bool,
    clear: bool,
    dry_run: bool,
) -> Result<(), TradeDeskError> {
    let rule = compile_trendline(symbol, coords, start, down)?;
    println!("Equation: {}", rule.equation);
    println!("Rule:     {}", rule.expression);
    if dry_run {
        println!("Name:     {}", rule.name);
        return Ok(());
    }
    let created = register_trendline(&sentinel_client(config)?, rule, clear)?;
    println!("Name:     {}", created.rule_name);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct IdeaOptions {
    pub sheet: bool,
    pub watch: bool,
    pub alert: bool,
    pub clear_watchlist: bool,
    pub clear_triggers: bool,
    pub clear_all_triggers: bool,
    pub watchlist: WatchlistKind,
}

/// Append the idea to the ideas worksheet. Returns the row written.
pub fn log_idea(
    sheet: &dyn SheetPort,
    worksheet: &str,
    idea: &TradeIdea,
    today: NaiveDate,
) -> Result<usize, TradeDeskError> {
    append_rows(sheet, worksheet, &[idea.sheet_row(today)])
}

/// Add `symbol` to the watchlist called `name`, emptying it first when
/// `clear` is set.
pub fn sync_watchlist(
    port: &dyn WatchlistPort,
    name: &str,
    symbol: &str,
    clear: bool,
) -> Result<(), TradeDeskError> {
    let lists = port.watchlists()?;
    let list = lists
        .iter()
        .find(|w| w.name == name)
        .ok_or_else(|| TradeDeskError::NotFound {
            what: format!("watchlist '{name}'"),
        })?;
    if clear {
        let mut removed = 0;
        for item in &list.items {
            match port.remove_item(list.id, item.id) {
                Ok(()) => removed += 1,
                Err(e) => warn!(watchlist = name, item = %item.tradingsymbol, error = %e, "could not remove item"),
            }
        }
        info!(watchlist = name, removed, "watchlist cleared");
    }
    port.add_item(list.id, symbol)?;
    info!(watchlist = name, symbol, "added to watchlist");
    Ok(())
}

/// Near-price alert on the first entry price. Returns the created rule name.
pub fn register_idea_alert(
    alerts: &dyn AlertPort,
    idea: &TradeIdea,
) -> Result<String, TradeDeskError> {
    let trigger = AdvancedTrigger::near_price(&idea.symbol, idea.entry.first, idea.margin, idea.side);
    Ok(alerts.create_advanced(&trigger)?.rule_name)
}

pub fn idea_summary(idea: &TradeIdea, rule_name: &str) -> String {
    let size = idea
        .position_size
        .map(|s| s.to_string())
        .unwrap_or_else(|| "None".to_string());
    let rule = "*".repeat(47);
    format!(
        "{rule}\nSymbol\t\t\t{}\nPosition size\t\t{size}\nEntry Price\t\t{}\nStop Loss\t\t{}\nRule name\t\t{rule_name}\n{rule}",
        idea.symbol,
        idea.entry,
        format_number(idea.stop_loss),
    )
}

/// Sheet, watchlist and alert steps for one idea, each behind its port.
/// Sheet failures abort; watchlist and alert failures are reported and the
/// remaining steps still run. Returns the alert rule name, `NA` if none.
pub fn idea_pipeline(
    idea: &TradeIdea,
    options: &IdeaOptions,
    sheet: Option<(&dyn SheetPort, &str)>,
    watchlist: Option<(&dyn WatchlistPort, &str)>,
    alerts: Option<&dyn AlertPort>,
    today: NaiveDate,
) -> Result<String, TradeDeskError> {
    if let Some((sheet, worksheet)) = sheet {
        let row = log_idea(sheet, worksheet, idea, today)?;
        info!(symbol = %idea.symbol, row, "idea logged");
    }

    if let Some((port, name)) = watchlist {
        if let Err(e) = sync_watchlist(port, name, &idea.symbol, options.clear_watchlist) {
            warn!(symbol = %idea.symbol, watchlist = name, error = %e, "watchlist not updated");
        }
    }

    let mut rule_name = "NA".to_string();
    if let Some(alerts) = alerts {
        if options.clear_triggers {
            if let Err(e) = clear_triggers(alerts, options.clear_all_triggers) {
                warn!(error = %e, "could not clear triggers");
            }
        }
        match register_idea_alert(alerts, idea) {
            Ok(name) => {
                info!(rule = %name, "alert created");
                rule_name = name;
            }
            Err(e) => warn!(symbol = %idea.symbol, error = %e, "alert not created"),
        }
    }
    Ok(rule_name)
}

fn run_idea(
    config: &dyn ConfigPort,
    idea: &TradeIdea,
    options: &IdeaOptions,
) -> Result<(), TradeDeskError> {
    let sheet = if options.sheet {
        Some(sheets_client(config)?)
    } else {
        None
    };
    let worksheet = ideas_worksheet(config);

    let kite = if options.watch {
        Some(kite_client(config)?)
    } else {
        None
    };
    let list_name = watchlist_name(config, options.watchlist);

    let sentinel = if options.alert {
        Some(sentinel_client(config)?)
    } else {
        None
    };

    let rule_name = idea_pipeline(
        idea,
        options,
        sheet
            .as_ref()
            .map(|s| (s as &dyn SheetPort, worksheet.as_str())),
        kite.as_ref()
            .map(|k| (k as &dyn WatchlistPort, list_name.as_str())),
        sentinel.as_ref().map(|s| s as &dyn AlertPort),
        Local::now().date_naive(),
    )?;
    println!("{}", idea_summary(idea, &rule_name));
    Ok(())
}

/// Entry triggers for every idea below the header row. Returns how many were
/// created; individual failures are logged and skipped.
pub fn sync_ideas_pipeline(
    sheet: &dyn SheetPort,
    worksheet: &str,
    header_row: usize,
    alerts: &dyn AlertPort,
) -> Result<usize, TradeDeskError> {
    let values = sheet.all_values(worksheet)?;
    let triggers = ideas_to_triggers(&records(&values, header_row));
    info!(ideas = triggers.len(), "found ideas");
    let mut created = 0;
    for trigger in &triggers {
        match alerts.create_basic(trigger) {
            Ok(c) => {
                debug!(rule = %c.rule_name, "trigger created");
                created += 1;
            }
            Err(e) => warn!(rule = %trigger.rule_name(), error = %e, "trigger not created"),
        }
    }
    Ok(created)
}

fn run_sync_ideas(config: &dyn ConfigPort) -> Result<(), TradeDeskError> {
    let sheet = sheets_client(config)?;
    let sentinel = sentinel_client(config)?;
    let header_row = config.get_int("sheets", "ideas_header_row", 4).max(1) as usize;
    let created = sync_ideas_pipeline(&sheet, &ideas_worksheet(config), header_row, &sentinel)?;
    println!("{created} triggers created");
    Ok(())
}

/// Closed round trips as CSV with a header row.
pub fn write_round_trips<W: Write>(out: W, trips: &[RoundTrip]) -> Result<(), TradeDeskError> {
    let csv_err = |e: csv::Error| TradeDeskError::Csv {
        file: "<output>".into(),
        reason: e.to_string(),
    };
    let mut writer = csv::Writer::from_writer(out);
    if trips.is_empty() {
        writer
            .write_record([
                "date", "symbol", "pos_type", "buy_qty", "buy_price", "sell_qty", "sell_price",
                "in_time", "out_time",
            ])
            .map_err(csv_err)?;
    }
    for trip in trips {
        writer.serialize(trip).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// Replay the fills and append every closed round trip to the trades
/// worksheet when a sheet is given.
pub fn trade_log_pipeline(
    fills: &[Fill],
    sheet: Option<(&dyn SheetPort, &str)>,
) -> Result<PositionBook, TradeDeskError> {
    let book = reconstruct(fills);
    for open in book.open_positions() {
        warn!(
            symbol = %open.symbol,
            net = open.net_quantity,
            opened = %open.opened,
            "position still open, not logged"
        );
    }
    if let Some((sheet, worksheet)) = sheet {
        if book.closed().is_empty() {
            info!("no closed trades to log");
        } else {
            let rows: Vec<_> = book.closed().iter().map(RoundTrip::sheet_row).collect();
            append_rows(sheet, worksheet, &rows)?;
        }
    }
    Ok(book)
}

fn run_trade_log(config: &dyn ConfigPort, orders: &Path, no_sheet: bool) -> Result<(), TradeDeskError> {
    let fills = read_order_fills(orders)?;
    info!(fills = fills.len(), file = %orders.display(), "orders loaded");
    let sheet = if no_sheet {
        None
    } else {
        Some(sheets_client(config)?)
    };
    let worksheet = trades_worksheet(config);
    let book = trade_log_pipeline(
        &fills,
        sheet
            .as_ref()
            .map(|s| (s as &dyn SheetPort, worksheet.as_str())),
    )?;
    write_round_trips(std::io::stdout().lock(), book.closed())
}

fn run_triggers(config: &dyn ConfigPort) -> Result<(), TradeDeskError> {
    let triggers = sentinel_client(config)?.triggers()?;
    for t in &triggers {
        println!("{}\t{}\t{}", t.id, t.status, t.rule_name);
    }
    info!(count = triggers.len(), "triggers listed");
    Ok(())
}

fn run_login(config: &dyn ConfigPort, service: Service) -> Result<(), TradeDeskError> {
    let (name, auth) = match service {
        Service::Kite => ("kite", kite_auth(config)),
        Service::Sentinel => ("sentinel", sentinel_auth(config)),
    };
    let session = auth.refresh()?;
    println!("logged in to {name} ({} cookies)", session.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trendline_command() {
        let cli = Cli::try_parse_from([
            "tradedesk", "trendline", "-s", "infy", "--coords", "1500", "1520", "75", "--start",
            "45", "9", "15", "--down", "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Trendline {
                symbol,
                coords,
                start,
                down,
                dry_run,
                clear,
            } => {
                assert_eq!(symbol, "infy");
                assert_eq!(coords, vec![1500.0, 1520.0, 75.0]);
                assert_eq!(start, vec![45, 9, 15]);
                assert!(down && dry_run && !clear);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn trendline_points_are_required() {
        let err = Cli::try_parse_from(["tradedesk", "trendline", "-s", "infy", "--start", "45", "9", "15"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        let err = Cli::try_parse_from(["tradedesk", "trendline", "-s", "infy", "--coords", "1", "2", "3"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_idea_defaults() {
        let cli = Cli::try_parse_from(["tradedesk", "idea", "-s", "sbin", "-e", "600-605"]).unwrap();
        match cli.command {
            Command::Idea {
                entry,
                side,
                margin,
                max_loss,
                swing,
                ..
            } => {
                assert_eq!(entry, EntryRange { first: 600.0, second: 605.0 });
                assert_eq!(side, Side::Long);
                assert_eq!(margin, None);
                assert_eq!(max_loss, 0.0);
                assert!(!swing);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_entry() {
        assert!(Cli::try_parse_from(["tradedesk", "idea", "-s", "X", "-e", "abc"]).is_err());
    }

    #[test]
    fn parses_login_service() {
        let cli = Cli::try_parse_from(["tradedesk", "-v", "login", "sentinel"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Login {
                service: Service::Sentinel
            }
        ));
    }

    #[test]
    fn compile_trendline_names_direction() {
        let rule = compile_trendline("tcs", &[100.0, 110.0, 10.0], &[1, 9, 15], false).unwrap();
        assert_eq!(rule.name, "TCS_UP");
        assert!(rule.expression.ends_with("> 0"));
        let rule = compile_trendline("tcs", &[100.0, 110.0, 10.0], &[1, 9, 15], true).unwrap();
        assert_eq!(rule.name, "TCS_Down");
    }

    #[test]
    fn compile_trendline_arity() {
        assert!(compile_trendline("tcs", &[1.0, 2.0], &[1, 9, 15], false).is_err());
        assert!(compile_trendline("tcs", &[1.0, 2.0, 3.0], &[1], false).is_err());
    }

    #[test]
    fn watchlist_names_from_config() {
        let config = FileConfigAdapter::from_string("[watchlists]\nswing = Positional\n").unwrap();
        assert_eq!(watchlist_name(&config, WatchlistKind::Swing), "Positional");
        assert_eq!(watchlist_name(&config, WatchlistKind::LongTerm), "Long term ideas");
    }

    #[test]
    fn margin_flag_overrides_configured_default() {
        let config = FileConfigAdapter::from_string("[idea]\nmargin_pct = 0.5\n").unwrap();
        assert_eq!(idea_margin(&config, None), 0.5);
        assert_eq!(idea_margin(&config, Some(1.2)), 1.2);
        assert_eq!(idea_margin(&FileConfigAdapter::empty(), None), DEFAULT_MARGIN_PCT);
    }

    #[test]
    fn sheets_needs_spreadsheet_id() {
        let err = sheets_client(&FileConfigAdapter::empty()).err().unwrap();
        assert!(matches!(err, TradeDeskError::ConfigMissing { .. }));
    }

    #[test]
    fn sheets_token_comes_from_named_variable() {
        let config = FileConfigAdapter::from_string(
            "[sheets]\nspreadsheet_id = abc\ntoken_env = TRADEDESK_TEST_UNSET_TOKEN\n",
        )
        .unwrap();
        let err = sheets_client(&config).err().unwrap();
        assert!(
            matches!(err, TradeDeskError::CredentialMissing { ref var } if var == "TRADEDESK_TEST_UNSET_TOKEN")
        );
    }

    #[test]
    fn sheets_prefers_service_account_key() {
        let config = FileConfigAdapter::from_string(&format!(
            "[sheets]\nspreadsheet_id = abc\ncredentials_file = {}/tests/fixtures/service_account.json\n\
             token_env = TRADEDESK_TEST_UNSET_TOKEN\n",
            env!("CARGO_MANIFEST_DIR")
        ))
        .unwrap();
        let token = sheets_token(&config).unwrap();
        assert!(matches!(token, SheetsToken::ServiceAccount(_)));
        assert!(sheets_client(&config).is_ok());
    }

    #[test]
    fn unreadable_key_file_is_a_config_error() {
        let config = FileConfigAdapter::from_string(
            "[sheets]\nspreadsheet_id = abc\ncredentials_file = /nonexistent/key.json\n",
        )
        .unwrap();
        let err = sheets_client(&config).err().unwrap();
        assert!(matches!(err, TradeDeskError::ConfigInvalid { .. }), "{err}");
    }

    #[test]
    fn explicit_missing_config_is_a_parse_error() {
        let err = load_config(Some(Path::new("/nonexistent/tradedesk.ini"))).err().unwrap();
        assert!(matches!(err, TradeDeskError::ConfigParse { .. }));
    }

    #[test]
    fn summary_block() {
        let idea = TradeIdea::new(
            "infy",
            Side::Long,
            "1500-1510".parse().unwrap(),
            1600.0,
            1480.0,
            0.3,
            1000.0,
        )
        .unwrap();
        let text = idea_summary(&idea, "INFY_Long_1500_NEAR_ALERT");
        assert!(text.contains("Symbol\t\t\tINFY"));
        assert!(text.contains("Position size\t\t50"));
        assert!(text.contains("Entry Price\t\t1500 - 1510"));
        assert!(text.contains("Stop Loss\t\t1480"));
        assert!(text.contains("Rule name\t\tINFY_Long_1500_NEAR_ALERT"));
    }

    #[test]
    fn round_trip_csv_has_header() {
        let mut out = Vec::new();
        write_round_trips(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("date,symbol,pos_type"));
    }
}
