//! Сессия котировок HLOC: по потребителю на тикер, случайные котировки,
//! листинг активных тикеров, закрытие и ожидание задач.
//!
//! Конфигурация берётся из `CHANCASTER_*` (например
//! `CHANCASTER_LOGGING__FORMAT=json`) или из файла, переданного первым
//! аргументом.

use std::{fmt, sync::Arc, time::Duration};

use chancaster::{init_logging, ChanCaster, Scope, Settings, StackError};
use chancaster_error::ResultExt;
use chrono::{DateTime, Local};
use rand::Rng;
use tracing::{info, warn};

#[derive(Debug, Clone)]
struct Hloc {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u32,
    datetime: DateTime<Local>,
}

impl Hloc {
    fn random() -> Self {
        let mut rng = rand::thread_rng();
        let open: f64 = rng.gen_range(100.0..200.0);
        let close: f64 = rng.gen_range(100.0..200.0);
        Self {
            open,
            high: open.max(close) + rng.gen_range(0.0..5.0),
            low: open.min(close) - rng.gen_range(0.0..5.0),
            close,
            volume: rng.gen_range(0..10_000),
            datetime: Local::now(),
        }
    }
}

impl fmt::Display for Hloc {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "o={:.2} h={:.2} l={:.2} c={:.2} v={} at {}",
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.datetime.format("%H:%M:%S%.3f")
        )
    }
}

type Quotes = ChanCaster<String, Hloc>;

/// Регистрирует тикер: задача сама берёт свой канал и печатает котировки
/// до конца потока.
fn start_symbol(
    caster: &Arc<Quotes>,
    symbol: &str,
) -> anyhow::Result<()> {
    let task_caster = Arc::clone(caster);
    let key = symbol.to_string();
    caster
        .add(symbol.to_string(), async move {
            let Some(rx) = task_caster.get(&key)? else {
                return Ok(());
            };
            while let Some(quote) = rx.recv().await {
                println!("Received quote for {key}: {quote}");
            }
            info!(symbol = %key, "quote stream ended");
            Ok::<(), StackError>(())
        })
        .with_context(|| format!("start {symbol}"))?;
    Ok(())
}

fn print_symbols(caster: &Quotes) {
    let mut symbols = caster.keys();
    if symbols.is_empty() {
        println!("No HLOCs found");
        return;
    }
    symbols.sort();
    println!("HLOCs found {symbols:?}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    init_logging(&settings.logging).map_err(|e| anyhow::anyhow!(e))?;

    let root = Scope::root();
    let caster = Arc::new(Quotes::with_config(&root, settings.caster));
    info!(caster = caster.name(), id = %caster.id(), "session started");

    for symbol in ["AAPL", "GOOG", "NVDA"] {
        start_symbol(&caster, symbol)?;
    }
    print_symbols(&caster);

    for round in 0..3 {
        for symbol in ["AAPL", "GOOG", "NVDA"] {
            let quote = Hloc::random();
            caster.publish(&symbol.to_string(), quote.clone()).await?;
            println!("Published HLOC for symbol {symbol} (round {round}): {quote}");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // Тикер без потребителя: публикация отклоняется.
    if let Err(err) = caster.publish(&"MSFT".to_string(), Hloc::random()).await {
        warn!(error = %err, status = err.status_code().http_status(), "publish rejected");
        println!("error publishing message: {err}");
    }

    caster.close(&"GOOG".to_string())?;
    print_symbols(&caster);

    for symbol in caster.keys() {
        caster.close(&symbol)?;
    }
    print_symbols(&caster);

    caster.wait().await?;
    println!("Session finished: {:?}", caster.stats());
    Ok(())
}
