// src/optimizer/service.rs
// Request flow: validate, reuse a helpful history record if one is close
// enough, otherwise produce a fresh result and record it.

use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::heuristics::heuristic_rewrite;
use super::prompt::build_optimization_prompt;
use super::response::parse_optimization_response;
use super::similarity::{MatchPolicy, QueryMatcher};
use super::{OptimizationCandidate, OptimizeRequest, Source};
use crate::error::{OptimizerError, OptimizerResult};
use crate::history::{Feedback, HistoryRecord, HistoryStore};
use crate::llm::LLMProvider;
use crate::monitoring::metrics;

/// How fresh results are produced
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerMode {
    Llm,
    Heuristic,
}

/// Millisecond-timestamp ids, bumped past the last issued id on collision
#[derive(Debug, Default)]
struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

pub struct OptimizerService {
    history: Arc<dyn HistoryStore>,
    provider: Option<Arc<dyn LLMProvider>>,
    policy: MatchPolicy,
    ids: IdGenerator,
}

impl OptimizerService {
    /// Fresh results come from the heuristic rules
    pub fn heuristic(history: Arc<dyn HistoryStore>, policy: MatchPolicy) -> Self {
        Self {
            history,
            provider: None,
            policy,
            ids: IdGenerator::default(),
        }
    }

    /// Fresh results come from `provider`
    pub fn with_provider(
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn LLMProvider>,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            history,
            provider: Some(provider),
            policy,
            ids: IdGenerator::default(),
        }
    }

    pub fn mode(&self) -> OptimizerMode {
        if self.provider.is_some() {
            OptimizerMode::Llm
        } else {
            OptimizerMode::Heuristic
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model_name())
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// The trimmed query, or a validation error
    pub fn validate(request: &OptimizeRequest) -> OptimizerResult<&str> {
        let query = request
            .sql_query
            .as_deref()
            .ok_or_else(|| OptimizerError::Validation("Missing required field: sqlQuery".to_string()))?;
        let query = query.trim();
        if query.is_empty() {
            return Err(OptimizerError::Validation("SQL query must not be empty".to_string()));
        }
        Ok(query)
    }

    pub async fn optimize(&self, request: &OptimizeRequest) -> OptimizerResult<OptimizationCandidate> {
        let query = match Self::validate(request) {
            Ok(q) => q,
            Err(e) => {
                metrics::record_optimize_outcome("invalid");
                return Err(e);
            }
        };

        let history = self.history_snapshot();
        if let Some(record) = QueryMatcher::find_match(query, &history, &self.policy) {
            info!(id = record.id, "Reusing helpful history record");
            metrics::record_optimize_outcome("history_hit");
            return Ok(OptimizationCandidate::from_history(record));
        }

        let candidate = match self.provider.as_deref() {
            Some(provider) => self.optimize_with_model(provider, query, request).await?,
            None => self.optimize_with_heuristics(query),
        };

        let record = HistoryRecord::from_candidate(&candidate, Utc::now());
        if let Err(e) = self.history.append(record) {
            warn!(error = %e, id = candidate.id, "Failed to record optimization in history");
            metrics::record_history_error("append");
        }

        metrics::record_optimize_outcome("fresh");
        Ok(candidate)
    }

    fn history_snapshot(&self) -> Vec<HistoryRecord> {
        match self.history.get() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "History unavailable, continuing without reuse");
                metrics::record_history_error("get");
                Vec::new()
            }
        }
    }

    fn optimize_with_heuristics(&self, query: &str) -> OptimizationCandidate {
        let rewrite = heuristic_rewrite(query);
        metrics::HEURISTIC_REWRITES_TOTAL.inc();
        debug!(fired = ?rewrite.fired, "Heuristic optimization produced");

        OptimizationCandidate {
            original_query: query.to_string(),
            optimized_query: rewrite.optimized_query.clone(),
            analysis: rewrite.analysis.clone(),
            performance_improvement: rewrite.performance_improvement(),
            index_suggestions: rewrite.index_suggestions,
            structure_suggestions: rewrite.structure_suggestions,
            server_suggestions: rewrite.server_suggestions,
            id: self.ids.next(),
            source: Source::OpenAi,
        }
    }

    async fn optimize_with_model(
        &self,
        provider: &dyn LLMProvider,
        query: &str,
        request: &OptimizeRequest,
    ) -> OptimizerResult<OptimizationCandidate> {
        let prompt = build_optimization_prompt(query, request);
        let started = Instant::now();

        let outcome = provider
            .generate(&prompt)
            .await
            .and_then(|content| parse_optimization_response(&content));
        metrics::observe_llm_call(started.elapsed().as_secs_f64() * 1000.0, outcome.is_ok());

        let parsed = outcome.map_err(|e| {
            error!(error = %e, model = provider.model_name(), "Model optimization failed");
            metrics::record_optimize_outcome("upstream_error");
            OptimizerError::Llm(e)
        })?;

        Ok(OptimizationCandidate {
            original_query: query.to_string(),
            optimized_query: parsed.optimized_query,
            analysis: parsed.analysis,
            performance_improvement: parsed.performance_improvement,
            index_suggestions: parsed.index_suggestions,
            structure_suggestions: parsed.structure_suggestions,
            server_suggestions: parsed.server_suggestions,
            id: self.ids.next(),
            source: Source::OpenAi,
        })
    }

    pub fn history(&self) -> OptimizerResult<Vec<HistoryRecord>> {
        Ok(self.history.get()?)
    }

    /// Returns false when no record has this id
    pub fn record_feedback(&self, id: i64, feedback: Feedback) -> OptimizerResult<bool> {
        let updated = self.history.update_feedback(id, feedback)?;
        if updated {
            metrics::record_feedback(feedback.as_str());
            info!(id, %feedback, "Feedback recorded");
        } else {
            debug!(id, "Feedback for unknown history id ignored");
        }
        Ok(updated)
    }

    pub fn remove_history(&self, id: i64) -> OptimizerResult<bool> {
        Ok(self.history.remove(id)?)
    }

    pub fn clear_history(&self) -> OptimizerResult<usize> {
        Ok(self.history.clear()?)
    }
}
