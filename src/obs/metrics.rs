// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	obs::{OperationKind, OperationOutcome},
};

/// Records a finished request: one `vc_issuer_bridge_operation_total` increment labeled by
/// operation, outcome and response status, plus its latency in
/// `vc_issuer_bridge_operation_duration_seconds`.
#[cfg(feature = "metrics")]
pub fn record_operation(
	kind: OperationKind,
	outcome: OperationOutcome,
	status: StatusCode,
	elapsed: StdDuration,
) {
	metrics::counter!(
		"vc_issuer_bridge_operation_total",
		"operation" => kind.as_str(),
		"outcome" => outcome.as_str(),
		"status" => status.as_u16().to_string()
	)
	.increment(1);
	metrics::histogram!("vc_issuer_bridge_operation_duration_seconds", "operation" => kind.as_str())
		.record(elapsed.as_secs_f64());
}

/// Metrics are compiled out without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
pub fn record_operation(_: OperationKind, _: OperationOutcome, _: StatusCode, _: StdDuration) {}
