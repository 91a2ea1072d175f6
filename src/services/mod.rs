pub mod dashboard;
pub mod scheduler;

pub use dashboard::{build_dashboard_snapshot, DashboardSnapshot};
pub use scheduler::run_analysis_scheduler;
