//! Stage identities and the invocation state machine shared by every flow.

// self
use crate::_prelude::*;

/// Stages of one pipeline invocation, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	/// Hop A: on-behalf-of exchange at identity provider A.
	OnBehalfOf,
	/// Hop B: SAML-bearer exchange at identity provider B.
	SamlBearer,
	/// Downstream resource collection read.
	ResourceFetch,
}
impl Stage {
	/// Every stage, in execution order.
	pub const ALL: [Stage; 3] = [Stage::OnBehalfOf, Stage::SamlBearer, Stage::ResourceFetch];

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::OnBehalfOf => "on_behalf_of",
			Stage::SamlBearer => "saml_bearer",
			Stage::ResourceFetch => "resource_fetch",
		}
	}

	/// Returns `true` for the two token exchange hops.
	pub const fn is_hop(self) -> bool {
		matches!(self, Stage::OnBehalfOf | Stage::SamlBearer)
	}

	pub(crate) const fn index(self) -> usize {
		match self {
			Stage::OnBehalfOf => 0,
			Stage::SamlBearer => 1,
			Stage::ResourceFetch => 2,
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Observable state of one pipeline invocation.
///
/// `Idle → HopAInFlight → HopBInFlight → FetchInFlight → Done`, with `Failed` and `Cancelled`
/// reachable from any in-flight state (`Cancelled` also from `Idle`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
	/// Created, no request issued yet.
	Idle,
	/// Waiting on the on-behalf-of exchange.
	HopAInFlight,
	/// Waiting on the SAML-bearer exchange.
	HopBInFlight,
	/// Waiting on the resource fetch.
	FetchInFlight,
	/// All stages succeeded.
	Done,
	/// A stage failed; later stages were not attempted.
	Failed {
		/// Stage that failed.
		stage: Stage,
	},
	/// The caller cancelled the invocation before or during `stage`.
	Cancelled {
		/// Stage that was about to start or was in flight.
		stage: Stage,
	},
}
impl PipelineState {
	/// In-flight state for `stage`.
	pub const fn in_flight(stage: Stage) -> Self {
		match stage {
			Stage::OnBehalfOf => PipelineState::HopAInFlight,
			Stage::SamlBearer => PipelineState::HopBInFlight,
			Stage::ResourceFetch => PipelineState::FetchInFlight,
		}
	}

	/// Returns `true` once the invocation can make no further progress.
	pub const fn is_terminal(self) -> bool {
		matches!(
			self,
			PipelineState::Done | PipelineState::Failed { .. } | PipelineState::Cancelled { .. }
		)
	}

	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			PipelineState::Idle => "idle",
			PipelineState::HopAInFlight => "hop_a_in_flight",
			PipelineState::HopBInFlight => "hop_b_in_flight",
			PipelineState::FetchInFlight => "fetch_in_flight",
			PipelineState::Done => "done",
			PipelineState::Failed { .. } => "failed",
			PipelineState::Cancelled { .. } => "cancelled",
		}
	}
}
impl Display for PipelineState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			PipelineState::Failed { stage } => write!(f, "failed({stage})"),
			PipelineState::Cancelled { stage } => write!(f, "cancelled({stage})"),
			other => f.write_str(other.as_str()),
		}
	}
}
