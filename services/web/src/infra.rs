use chrono::NaiveDate;
use disclosure_reports::config::DisclosureConfig;
use disclosure_reports::disclosure::{
    FixtureDataSource, NavigationController, NavigationPath, Rendered, ReportCatalog,
    SessionCache, YearPolicy,
};
use disclosure_reports::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

const SAMPLE_DATA: &str = include_str!("../data/sample.json");

pub(crate) const SESSION_COOKIE: &str = "disclosure_session";

pub(crate) type Controller = NavigationController<FixtureDataSource>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) sessions: SessionRegistry,
    pub(crate) disclosure: DisclosureContext,
}

/// Everything a new navigation session is built from.
#[derive(Clone)]
pub(crate) struct DisclosureContext {
    pub(crate) source: Arc<FixtureDataSource>,
    pub(crate) catalog: Arc<ReportCatalog>,
    pub(crate) policy: YearPolicy,
    pub(crate) lookup_timeout: Duration,
}

impl DisclosureContext {
    pub(crate) fn from_config(config: &DisclosureConfig) -> Result<Self, AppError> {
        let source = match &config.data_path {
            Some(path) => FixtureDataSource::from_path(path)?,
            None => FixtureDataSource::from_json(SAMPLE_DATA)?,
        };

        Ok(Self {
            source: Arc::new(source),
            catalog: Arc::new(ReportCatalog::standard()?),
            policy: config.year_policy(),
            lookup_timeout: config.lookup_timeout,
        })
    }

    pub(crate) fn controller(&self) -> Controller {
        NavigationController::new(
            Arc::clone(&self.source),
            SessionCache::new(),
            Arc::clone(&self.catalog),
            self.policy.clone(),
        )
        .with_lookup_timeout(self.lookup_timeout)
    }

    /// Moves the session to `request.path`, waits for any lookup it needs and
    /// loads the report record before rendering.
    pub(crate) async fn drive(
        &self,
        controller: &mut Controller,
        request: NavigationRequest,
    ) -> Rendered {
        controller.navigate(request.path);
        if request.retry {
            controller.retry();
        }
        if let Some(query) = request.query.as_deref() {
            controller.search(query).await;
        }
        controller.settle().await;

        if let Some(key) = controller.missing_report() {
            match self.source.report(&key) {
                Some(record) => {
                    controller.cache_report(record);
                }
                None => debug!(report = %key.report_id, "no published record for report"),
            }
        }

        match request.today {
            Some(today) => controller.render_on(today),
            None => controller.render(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct NavigationRequest {
    pub(crate) path: NavigationPath,
    pub(crate) query: Option<String>,
    pub(crate) retry: bool,
    pub(crate) today: Option<NaiveDate>,
}

impl NavigationRequest {
    pub(crate) fn to(path: NavigationPath) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }
}

pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) created: bool,
    pub(crate) controller: Arc<AsyncMutex<Controller>>,
}

struct SessionEntry {
    controller: Arc<AsyncMutex<Controller>>,
    last_used: Instant,
}

/// Navigation sessions keyed by the session cookie. Sessions idle for longer
/// than `idle_timeout` are dropped on the next checkout, and the least
/// recently used one is dropped when `capacity` is reached.
#[derive(Clone)]
pub(crate) struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    idle_timeout: Duration,
    capacity: usize,
}

impl SessionRegistry {
    pub(crate) fn new(idle_timeout: Duration, capacity: usize) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn from_config(config: &DisclosureConfig) -> Self {
        Self::new(config.session_idle, config.max_sessions)
    }

    /// Returns the session named by `cookie`, or a fresh one when the cookie
    /// is missing, unknown or expired.
    pub(crate) fn checkout(&self, cookie: Option<&str>, context: &DisclosureContext) -> Session {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_used) < self.idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, active = sessions.len(), "idle navigation sessions dropped");
        }

        if let Some((id, entry)) =
            cookie.and_then(|id| sessions.get_mut(id).map(|entry| (id, entry)))
        {
            entry.last_used = now;
            return Session {
                id: id.to_string(),
                created: false,
                controller: Arc::clone(&entry.controller),
            };
        }

        while sessions.len() >= self.capacity {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            debug!(session = %oldest, "least recently used navigation session dropped");
        }

        let id = Uuid::new_v4().to_string();
        let controller = Arc::new(AsyncMutex::new(context.controller()));
        sessions.insert(
            id.clone(),
            SessionEntry {
                controller: Arc::clone(&controller),
                last_used: now,
            },
        );
        debug!(session = %id, active = sessions.len(), "navigation session started");

        Session {
            id,
            created: true,
            controller,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub(crate) fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

pub(crate) fn read_session_cookie(raw: &str) -> Option<&str> {
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Minimal document around the rendered content region.
pub(crate) fn page_frame(content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Disclosure reports</title>\n</head>\n<body>\n{content}</body>\n</html>\n"
    )
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let config = DisclosureConfig::default();
    let disclosure = DisclosureContext::from_config(&config).expect("bundled data loads");
    AppState {
        readiness: Arc::new(AtomicBool::new(true)),
        metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        sessions: SessionRegistry::from_config(&config),
        disclosure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_session_cookie_among_others() {
        assert_eq!(
            read_session_cookie("theme=dark; disclosure_session=abc-123; lang=en"),
            Some("abc-123")
        );
        assert_eq!(read_session_cookie("theme=dark"), None);
        assert_eq!(read_session_cookie("disclosure_session="), None);
    }

    #[test]
    fn unknown_cookies_start_a_new_session() {
        let state = test_state();
        let first = state.sessions.checkout(None, &state.disclosure);
        assert!(first.created);

        let again = state
            .sessions
            .checkout(Some(first.id.as_str()), &state.disclosure);
        assert!(!again.created);
        assert!(Arc::ptr_eq(&first.controller, &again.controller));

        let stranger = state.sessions.checkout(Some("forged"), &state.disclosure);
        assert!(stranger.created);
        assert_ne!(stranger.id, "forged");
        assert_eq!(state.sessions.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_dropped() {
        let state = test_state();
        let registry = SessionRegistry::new(Duration::from_secs(60), 100);
        let idle = registry.checkout(None, &state.disclosure);

        tokio::time::advance(Duration::from_secs(45)).await;
        let busy = registry.checkout(None, &state.disclosure);
        assert_eq!(registry.len(), 2);

        tokio::time::advance(Duration::from_secs(30)).await;
        let again = registry.checkout(Some(busy.id.as_str()), &state.disclosure);
        assert!(!again.created);
        assert_eq!(registry.len(), 1);

        let returning = registry.checkout(Some(idle.id.as_str()), &state.disclosure);
        assert!(returning.created);
        assert_ne!(returning.id, idle.id);
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_drops_the_least_recently_used_session() {
        let state = test_state();
        let registry = SessionRegistry::new(Duration::from_secs(3600), 2);
        let first = registry.checkout(None, &state.disclosure);
        tokio::time::advance(Duration::from_secs(1)).await;
        let second = registry.checkout(None, &state.disclosure);
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.checkout(Some(first.id.as_str()), &state.disclosure);
        tokio::time::advance(Duration::from_secs(1)).await;

        registry.checkout(None, &state.disclosure);
        assert_eq!(registry.len(), 2);
        assert!(!registry.checkout(Some(first.id.as_str()), &state.disclosure).created);
        assert!(registry.checkout(Some(second.id.as_str()), &state.disclosure).created);
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_date("2018-11-15"),
            Ok(NaiveDate::from_ymd_opt(2018, 11, 15).expect("valid date"))
        );
        assert!(parse_date("15/11/2018").is_err());
    }
}
