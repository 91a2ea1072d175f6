use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder. The handle renders the scrape
/// payload served on `/metrics`.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Zero-valued so dashboards see every series from the first scrape.
    counter!("analysis_cycles_total").absolute(0);
    counter!("analysis_cycle_failures_total").absolute(0);
    counter!("positions_opened_total").absolute(0);

    gauge!("open_positions").set(0.0);
    gauge!("account_balance").set(0.0);

    // Histograms only exist once recorded into.
    histogram!("analysis_cycle_seconds").record(0.0);

    Ok(handle)
}
