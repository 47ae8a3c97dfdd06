// =============================================================================
// Central Application State — Aurora Market Simulator
// =============================================================================
//
// The single source of truth for the simulator. Holds the configuration, the
// injected clock and RNG, the current pair/timeframe selection and the last
// published market snapshot.
//
// A refresh pass runs in three steps:
//   1. `begin_refresh`    capture the selected pair and its selection epoch.
//   2. `generate_snapshot` build every market view from that capture.
//   3. `publish`          swap the snapshot in, unless the selection moved on.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for shared state, parking_lot::Mutex for the RNG.
//   - Published snapshots are immutable `Arc`s, replaced wholesale.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{SimError, SimResult};
use crate::market_data::klines::generate_kline_bundle;
use crate::market_data::orderbook::generate_order_book;
use crate::market_data::pairs::find_pair;
use crate::market_data::positions::generate_positions;
use crate::market_data::trade_tape::generate_trade_tape;
use crate::market_data::{CandleSeries, KlineBundle, OrderBookSnapshot, Position, Timeframe, TradeTape};
use crate::runtime_config::SimConfig;
use crate::types::{TapeMode, TradingPair};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// Market Snapshot
// =============================================================================

/// Every market view for one pair, generated in a single refresh pass.
///
/// This is the unit of publication: consumers always see all of it or none.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    /// State version assigned at publication.
    pub version: u64,
    /// Unix ms of the clock reading the pass was generated from.
    pub generated_at: i64,
    pub pair: TradingPair,
    /// Chart timeframe selected when the pass began.
    pub timeframe: Timeframe,
    pub klines: KlineBundle,
    pub order_book: OrderBookSnapshot,
    pub trades: TradeTape,
    pub positions: Vec<Position>,
}

impl MarketSnapshot {
    /// Every part belongs to `pair` and satisfies its own invariants.
    pub fn is_consistent(&self) -> bool {
        self.klines.symbol == self.pair.symbol
            && self.trades.symbol == self.pair.symbol
            && self.positions.iter().all(|p| p.pair == self.pair.symbol)
            && self.klines.series.values().all(CandleSeries::is_well_formed)
            && self.order_book.is_well_formed()
            && self.trades.is_time_ordered()
    }
}

/// What a refresh pass was started from.
#[derive(Debug, Clone)]
pub struct RefreshTicket {
    pub epoch: u64,
    pub pair: TradingPair,
    pub timeframe: Timeframe,
    pub now_ms: i64,
    candle_count: usize,
    order_book_depth: usize,
    trade_count: usize,
    tape_mode: TapeMode,
}

#[derive(Debug, Clone)]
struct Selection {
    pair: TradingPair,
    epoch: u64,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter. Incremented on every
    /// publication and selection change. The WebSocket feed uses this to
    /// detect changes and push updates.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<SimConfig>>,

    // ── Injected sources ────────────────────────────────────────────────
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,

    // ── Selection ───────────────────────────────────────────────────────
    selection: RwLock<Selection>,
    selected_timeframe: RwLock<Timeframe>,
    /// Signalled whenever the selected pair changes.
    selection_changed: Notify,

    // ── Published market state ──────────────────────────────────────────
    published: RwLock<Option<Arc<MarketSnapshot>>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` driven by the system clock.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Construct a new `AppState` reading time from `clock`.
    ///
    /// The RNG is seeded from `config.seed`, or from OS entropy when unset.
    /// Fails when `config.default_symbol` is not in the pair catalogue.
    pub fn with_clock(config: SimConfig, clock: Arc<dyn Clock>) -> SimResult<Self> {
        let pair = find_pair(&config.pairs, &config.default_symbol)
            .ok_or_else(|| SimError::UnknownPair(config.default_symbol.clone()))?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            symbol = %pair.symbol,
            timeframe = %config.default_timeframe,
            seeded = config.seed.is_some(),
            "app state initialised"
        );

        Ok(Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),

            selected_timeframe: RwLock::new(config.default_timeframe),
            runtime_config: Arc::new(RwLock::new(config)),

            clock,
            rng: Mutex::new(rng),

            selection: RwLock::new(Selection { pair, epoch: 0 }),
            selection_changed: Notify::new(),

            published: RwLock::new(None),

            recent_errors: RwLock::new(Vec::new()),

            start_time: std::time::Instant::now(),
        })
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version and return the new value.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn pairs(&self) -> Vec<TradingPair> {
        self.runtime_config.read().pairs.clone()
    }

    pub fn selected_pair(&self) -> TradingPair {
        self.selection.read().pair.clone()
    }

    /// Number of pair switches since startup.
    pub fn selection_epoch(&self) -> u64 {
        self.selection.read().epoch
    }

    pub fn selected_timeframe(&self) -> Timeframe {
        *self.selected_timeframe.read()
    }

    /// The last published snapshot, if any pass has completed yet.
    pub fn snapshot(&self) -> Option<Arc<MarketSnapshot>> {
        self.published.read().clone()
    }

    /// Wakes the refresh loop on pair switches.
    pub fn selection_changed(&self) -> &Notify {
        &self.selection_changed
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// Switch to the pair named `symbol` and publish fresh data for it.
    ///
    /// Any refresh pass already in flight for the previous pair is
    /// superseded and will be discarded at publication.
    pub fn select_pair(&self, symbol: &str) -> SimResult<Arc<MarketSnapshot>> {
        let pair = find_pair(&self.runtime_config.read().pairs, symbol)
            .ok_or_else(|| SimError::UnknownPair(symbol.to_string()))?;

        let epoch = {
            let mut selection = self.selection.write();
            selection.epoch += 1;
            selection.pair = pair.clone();
            selection.epoch
        };
        info!(symbol = %pair.symbol, epoch, "pair selected");

        let ticket = self.begin_refresh();
        let snapshot = self.generate_snapshot(&ticket)?;
        let published = self.publish(&ticket, snapshot);

        self.selection_changed.notify_one();

        match published {
            Some(snapshot) => Ok(snapshot),
            // Another switch landed while this one was generating; report
            // whatever that one published.
            None => self
                .snapshot()
                .ok_or_else(|| SimError::UnknownPair(symbol.to_string())),
        }
    }

    /// Change the chart timeframe shown by the dashboard.
    ///
    /// Kline data already covers every timeframe, so no regeneration happens.
    pub fn set_timeframe(&self, timeframe: Timeframe) {
        let previous = std::mem::replace(&mut *self.selected_timeframe.write(), timeframe);
        if previous != timeframe {
            info!(from = %previous, to = %timeframe, "timeframe selected");
            self.increment_version();
        }
    }

    // ── Refresh pass ────────────────────────────────────────────────────

    /// Capture everything a refresh pass needs.
    pub fn begin_refresh(&self) -> RefreshTicket {
        let selection = self.selection.read().clone();
        let config = self.runtime_config.read();
        RefreshTicket {
            epoch: selection.epoch,
            pair: selection.pair,
            timeframe: self.selected_timeframe(),
            now_ms: self.clock.now_ms(),
            candle_count: config.candle_count,
            order_book_depth: config.order_book_depth,
            trade_count: config.trade_count,
            tape_mode: config.tape_mode,
        }
    }

    /// Generate every market view for `ticket`. Touches only the RNG.
    pub fn generate_snapshot(&self, ticket: &RefreshTicket) -> SimResult<MarketSnapshot> {
        let mut rng = self.rng.lock();
        let pair = &ticket.pair;

        let klines = generate_kline_bundle(pair, ticket.candle_count, ticket.now_ms, &mut *rng)?;
        let order_book = generate_order_book(pair, ticket.order_book_depth, &mut *rng)?;
        let trades = generate_trade_tape(
            pair,
            ticket.trade_count,
            ticket.tape_mode,
            ticket.now_ms,
            &mut *rng,
        )?;
        let positions = generate_positions(pair, &mut *rng)?;

        Ok(MarketSnapshot {
            version: 0,
            generated_at: ticket.now_ms,
            pair: pair.clone(),
            timeframe: ticket.timeframe,
            klines,
            order_book,
            trades,
            positions,
        })
    }

    /// Publish `snapshot` if `ticket` still matches the current selection.
    ///
    /// Returns the published snapshot, or `None` when the pass was stale or
    /// its output failed validation.
    pub fn publish(
        &self,
        ticket: &RefreshTicket,
        mut snapshot: MarketSnapshot,
    ) -> Option<Arc<MarketSnapshot>> {
        if !snapshot.is_consistent() {
            error!(symbol = %ticket.pair.symbol, "generated snapshot failed validation");
            self.push_error(format!("inconsistent snapshot for {}", ticket.pair.symbol));
            return None;
        }

        let mut published = self.published.write();

        let current_epoch = self.selection.read().epoch;
        if current_epoch != ticket.epoch {
            info!(
                symbol = %ticket.pair.symbol,
                ticket_epoch = ticket.epoch,
                current_epoch,
                "stale refresh discarded"
            );
            return None;
        }

        snapshot.version = self.increment_version();
        let snapshot = Arc::new(snapshot);
        *published = Some(Arc::clone(&snapshot));
        drop(published);

        debug!(
            symbol = %snapshot.pair.symbol,
            version = snapshot.version,
            best_bid = ?snapshot.order_book.best_bid(),
            best_ask = ?snapshot.order_book.best_ask(),
            mid = ?snapshot.order_book.mid_price(),
            imbalance = snapshot.order_book.imbalance(),
            trades = snapshot.trades.len(),
            volume_delta = snapshot.trades.volume_delta(),
            "market snapshot published"
        );
        Some(snapshot)
    }

    /// Run one complete refresh pass for the current selection.
    pub fn refresh(&self) -> SimResult<Option<Arc<MarketSnapshot>>> {
        let ticket = self.begin_refresh();
        let snapshot = self.generate_snapshot(&ticket)?;
        Ok(self.publish(&ticket, snapshot))
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Save the config with the current pair and timeframe as the startup
    /// selection.
    pub fn persist_config(&self, path: impl AsRef<std::path::Path>) -> anyhow::Result<()> {
        let mut config = self.runtime_config.read().clone();
        config.default_symbol = self.selected_pair().symbol;
        config.default_timeframe = self.selected_timeframe();
        config.save(path)
    }

    // ── Dashboard View ──────────────────────────────────────────────────

    /// Assemble the dashboard payload around `market`.
    pub fn view<'a>(&self, market: Option<&'a MarketSnapshot>) -> DashboardView<'a> {
        DashboardView {
            state_version: self.current_state_version(),
            server_time: self.clock.now_ms(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            selected_symbol: self.selected_pair().symbol,
            selected_timeframe: self.selected_timeframe(),
            market,
            recent_errors: {
                let errors = self.recent_errors.read();
                if errors.is_empty() {
                    None
                } else {
                    Some(errors.clone())
                }
            },
        }
    }
}

// =============================================================================
// Dashboard View Types
// =============================================================================

/// Payload of `GET /api/v1/state` and every WebSocket push.
#[derive(Debug, Serialize)]
pub struct DashboardView<'a> {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub selected_symbol: String,
    pub selected_timeframe: Timeframe,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<&'a MarketSnapshot>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_errors: Option<Vec<ErrorRecord>>,
}

// =============================================================================
// Tests
// =============================================================================
