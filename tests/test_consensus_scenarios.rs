//! End-to-end consensus scenarios on the synchronous API
//!
//! Adapters are driven directly and the engine is ticked by hand, with fixed
//! clocks so every run is reproducible.

use crossflow::domains::{
    market, seismic, sentiment, MarketEvent, MarketModel, SeismicModel, SentimentEvent,
    SentimentModel,
};
use crossflow::pipeline::{
    Adapter, AdapterConfig, ConsensusConfig, CorrelationConfig, Direction, DomainAdapter,
    DomainId, PairPhase, ResonanceEngine, TickReport,
};

const TICKS: i64 = 60;

struct World {
    market: Adapter<MarketModel>,
    sentiment: Adapter<SentimentModel>,
    seismic: Adapter<SeismicModel>,
    engine: ResonanceEngine,
}

impl World {
    fn new() -> Self {
        let config = AdapterConfig::new(200, 20, 5);
        let correlation = CorrelationConfig {
            min_samples: 20,
            window: 50,
            max_lag: 3,
            ..CorrelationConfig::default()
        };
        Self {
            market: Adapter::new_with_timestamp_fn(MarketModel::default(), config, Box::new(|| 0))
                .unwrap(),
            sentiment: Adapter::new_with_timestamp_fn(
                SentimentModel::default(),
                config,
                Box::new(|| 0),
            )
            .unwrap(),
            // Never receives events: contributes its default signature
            seismic: Adapter::new_with_timestamp_fn(
                SeismicModel::default(),
                seismic::adapter_config(),
                Box::new(|| 0),
            )
            .unwrap(),
            engine: ResonanceEngine::new_with_timestamp_fn(
                correlation,
                ConsensusConfig::default(),
                Box::new(|| 1_000),
            )
            .unwrap(),
        }
    }

    fn tick(&mut self) -> TickReport {
        let snapshot = vec![
            self.market.extract_signature(None),
            self.sentiment.extract_signature(None),
            self.seismic.extract_signature(None),
        ];
        self.engine.tick(&snapshot)
    }
}

/// Return accelerates quadratically, so momentum keeps rising
fn market_event(t: i64, sign: f64) -> MarketEvent {
    let ret = sign * 0.00005 * (t * t) as f64;
    MarketEvent {
        timestamp_ms: t,
        price: 100.0 * (1.0 + ret),
        previous_close: 100.0,
        volume: 750_000.0,
    }
}

fn sentiment_event(t: i64, sign: f64) -> SentimentEvent {
    SentimentEvent {
        timestamp_ms: t,
        polarity: sign * (-0.5 + 0.0002 * (t * t) as f64),
        subjectivity: 0.5,
        mention_count: 300,
    }
}

fn run(sentiment_sign: f64) -> Vec<TickReport> {
    let mut world = World::new();
    let mut reports = Vec::new();
    for t in 0..TICKS {
        world.market.process(market_event(t, 1.0)).unwrap();
        world.sentiment.process(sentiment_event(t, sentiment_sign)).unwrap();
        reports.push(world.tick());
    }
    reports
}

#[test]
fn test_agreeing_domains_predict_up() {
    // Scenario: market and sentiment both accelerate upward; seismic is silent
    let reports = run(1.0);

    for report in &reports[..19] {
        assert_eq!(report.prediction.direction, Direction::Neutral);
        assert!(report.prediction.insufficient_correlation);
        assert_eq!(report.prediction.confidence, 0.0);
    }

    let ready_at = reports
        .iter()
        .position(|r| r.newly_ready > 0)
        .expect("pair becomes ready");
    assert_eq!(ready_at, 19);

    let last = reports.last().unwrap();
    assert_eq!(last.correlations.len(), 1);
    assert!(last.correlations[0].coefficient > 0.9);

    let p = &last.prediction;
    assert_eq!(p.direction, Direction::Up);
    assert!(!p.insufficient_correlation);
    assert!(p.confidence > 0.0 && p.confidence <= 1.0);
    assert!(p.magnitude > 0.0 && p.magnitude <= 1.0);

    // Silent seismic domain is present but carries no confidence
    let seismic = p
        .contributions
        .iter()
        .find(|c| c.domain.as_str() == "seismic")
        .unwrap();
    assert!(seismic.default_signature);
    assert_eq!(seismic.confidence, 0.0);
    assert_eq!(seismic.vote, Direction::Neutral);
    assert!(p.consensus_strength < 1.0);
}

#[test]
fn test_opposing_domains_lower_consensus() {
    // Scenario: sentiment mirrors the market move with the opposite sign
    let agreeing = run(1.0);
    let opposing = run(-1.0);

    let corr = &opposing.last().unwrap().correlations[0];
    assert!(corr.coefficient < -0.9);

    let votes: Vec<Direction> = opposing
        .last()
        .unwrap()
        .prediction
        .contributions
        .iter()
        .filter(|c| !c.default_signature)
        .map(|c| c.vote)
        .collect();
    assert_eq!(votes, vec![Direction::Up, Direction::Down]);

    let opposing_strength = opposing.last().unwrap().prediction.consensus_strength;
    let agreeing_strength = agreeing.last().unwrap().prediction.consensus_strength;
    assert!(opposing_strength < agreeing_strength);
    assert!(opposing_strength > 0.0 && opposing_strength < 1.0);
}

#[test]
fn test_identical_inputs_identical_predictions() {
    let first = run(1.0);
    let second = run(1.0);

    let encode = |reports: &[TickReport]| serde_json::to_string(reports).unwrap();
    assert_eq!(encode(&first), encode(&second));
}

#[test]
fn test_readiness_persists_through_silence() {
    let mut world = World::new();
    for t in 0..TICKS {
        world.market.process(market_event(t, 1.0)).unwrap();
        world.sentiment.process(sentiment_event(t, 1.0)).unwrap();
        world.tick();
    }

    let m = DomainId::new(market::DOMAIN);
    let s = DomainId::new(sentiment::DOMAIN);
    assert_eq!(world.engine.pair_phase(&m, &s), PairPhase::Ready);

    // No new events: signatures repeat, the pair stays Ready
    for _ in 0..10 {
        let report = world.tick();
        assert_eq!(world.engine.pair_phase(&m, &s), PairPhase::Ready);
        assert_eq!(report.correlations.len(), 1);
    }
}
