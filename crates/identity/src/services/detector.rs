//! Duplicate detection: single-candidate checks and the batch scan.
//!
//! Detection is advisory. Candidate-gathering or audit failures degrade to
//! a "no duplicate" answer with a warning rather than blocking the caller
//! (a registration must not fail because this heuristic could not run).

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::PgPool;

use stagelink_core::similarity::{
    DUPLICATE_SCORE_CUTOFF, EMAIL_SIMILARITY_THRESHOLD, NAME_SIMILARITY_THRESHOLD,
    PHONE_MATCH_SCORE, similarity,
};
use stagelink_core::{DetectionType, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::{
    DetectionResult, DuplicateCandidate, Identity, NewDetectionLogEntry, UserIdentity,
};
use crate::services::audit::AuditSink;

/// Finds existing users that are likely the same person as a candidate.
pub struct DuplicateDetector {
    pool: PgPool,
    audit: Arc<dyn AuditSink>,
}

impl DuplicateDetector {
    /// Create a detector over a pool and an audit sink.
    #[must_use]
    pub fn new(pool: PgPool, audit: Arc<dyn AuditSink>) -> Self {
        Self { pool, audit }
    }

    /// Evaluate one candidate identity against the existing user base.
    ///
    /// Exact case-insensitive email equality short-circuits at score 1.0;
    /// otherwise fuzzy email/name scoring runs over a bounded candidate
    /// set plus exact phone matches. The evaluation is logged through the
    /// audit sink regardless of outcome; neither gathering nor logging
    /// failures affect the returned result.
    pub async fn check_single(&self, identity: &Identity) -> DetectionResult {
        let normalized_email = identity.email.normalized();

        let result = match self.evaluate(identity, &normalized_email).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    email = %normalized_email,
                    error = %e,
                    "Duplicate check degraded to no-match"
                );
                DetectionResult::no_match()
            }
        };

        let entry = NewDetectionLogEntry::from_result(
            normalized_email,
            DetectionType::RegistrationAttempt,
            None,
            &result,
        );
        if let Err(e) = self.audit.log_detection(entry).await {
            tracing::warn!(error = %e, "Failed to log detection evaluation");
        }

        result
    }

    async fn evaluate(
        &self,
        identity: &Identity,
        normalized_email: &str,
    ) -> Result<DetectionResult, RepositoryError> {
        let repo = UserRepository::new(&self.pool);

        if let Some(user) = repo.find_by_normalized_email(normalized_email).await? {
            return Ok(DetectionResult::exact_match(user.id));
        }

        let (local_part, domain) = normalized_email
            .split_once('@')
            .unwrap_or((normalized_email, ""));
        let fuzzy = repo.fuzzy_candidates(local_part, domain).await?;

        let phone_matches = match &identity.normalized_phone {
            Some(phone) => repo.user_ids_by_normalized_phone(phone).await?,
            None => Vec::new(),
        };

        Ok(evaluate_candidates(
            identity,
            normalized_email,
            &fuzzy,
            &phone_matches,
        ))
    }

    /// Scan the entire user base for duplicate pairs.
    ///
    /// O(n²) string comparisons over all users, oldest first - acceptable
    /// for operator-triggered batch jobs, never for the request path. Each
    /// hit is logged as an `EXISTING_SCAN` evaluation, best-effort.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the user base cannot be loaded.
    pub async fn scan_all(&self) -> Result<Vec<DuplicateCandidate>, RepositoryError> {
        let users = UserRepository::new(&self.pool).all_user_identities().await?;
        tracing::info!(users = users.len(), "Scanning user base for duplicates");

        let candidates = find_duplicate_pairs(&users);

        for candidate in &candidates {
            let entry = NewDetectionLogEntry {
                normalized_email: stagelink_core::normalize::email(&candidate.duplicate.email),
                detection_type: DetectionType::ExistingScan,
                candidate_user_id: Some(candidate.duplicate.id),
                matched_user_id: Some(candidate.original.id),
                similarity_score: candidate.similarity_score,
                reason: candidate.reasons.join("; "),
            };
            if let Err(e) = self.audit.log_detection(entry).await {
                tracing::warn!(error = %e, "Failed to log scan detection");
            }
        }

        Ok(candidates)
    }
}

/// Score a candidate identity against gathered users. Pure.
///
/// A user is interesting when its email similarity exceeds 0.8 or its
/// name similarity exceeds 0.9; phone-matched users are always
/// interesting at a floor score of 0.95. The single best-scoring user
/// wins; below the 0.8 cutoff the answer is "not a duplicate".
fn evaluate_candidates(
    identity: &Identity,
    normalized_email: &str,
    fuzzy: &[UserIdentity],
    phone_matches: &[UserId],
) -> DetectionResult {
    // Insertion-ordered so equal scores resolve deterministically.
    let mut interesting: Vec<(UserId, f64, Vec<String>)> = Vec::new();

    for user in fuzzy {
        let email_sim = similarity(normalized_email, &user.normalized_email);
        let name_sim = name_similarity(identity.name.as_deref(), user.name.as_deref());

        let mut score: f64 = 0.0;
        let mut reasons = Vec::new();
        if email_sim > EMAIL_SIMILARITY_THRESHOLD {
            score = email_sim;
            reasons.push(format!("Similar email ({:.0}% match)", email_sim * 100.0));
        }
        if name_sim > NAME_SIMILARITY_THRESHOLD {
            score = score.max(name_sim);
            reasons.push(format!("Similar name ({:.0}% match)", name_sim * 100.0));
        }
        if !reasons.is_empty() {
            interesting.push((user.id, score, reasons));
        }
    }

    for &user_id in phone_matches {
        if let Some(entry) = interesting.iter_mut().find(|(id, _, _)| *id == user_id) {
            entry.1 = entry.1.max(PHONE_MATCH_SCORE);
            entry.2.push("Same phone number".to_owned());
        } else {
            interesting.push((
                user_id,
                PHONE_MATCH_SCORE,
                vec!["Same phone number".to_owned()],
            ));
        }
    }

    let best = interesting
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((user_id, score, reasons)) if score > DUPLICATE_SCORE_CUTOFF => DetectionResult {
            is_duplicate: true,
            matched_user_id: Some(user_id),
            similarity_score: score,
            reason: reasons.join("; "),
        },
        _ => DetectionResult::no_match(),
    }
}

/// Compare every ordered pair of users, oldest first. Pure.
///
/// Once a user has been flagged as a duplicate of an earlier original,
/// its email joins a processed set so the same account is not re-reported
/// against every other earlier candidate.
fn find_duplicate_pairs(users: &[UserIdentity]) -> Vec<DuplicateCandidate> {
    let mut processed: HashSet<&str> = HashSet::new();
    let mut hits = Vec::new();

    for (i, original) in users.iter().enumerate() {
        for duplicate in users.iter().skip(i + 1) {
            if processed.contains(duplicate.normalized_email.as_str()) {
                continue;
            }

            if let Some((score, reasons)) = score_pair(original, duplicate) {
                processed.insert(duplicate.normalized_email.as_str());
                hits.push(DuplicateCandidate {
                    original: original.into(),
                    duplicate: duplicate.into(),
                    similarity_score: score,
                    reasons,
                });
            }
        }
    }

    hits
}

/// Score one ordered pair of existing users. Pure.
fn score_pair(original: &UserIdentity, duplicate: &UserIdentity) -> Option<(f64, Vec<String>)> {
    let mut score: f64 = 0.0;
    let mut reasons = Vec::new();

    if original.normalized_email == duplicate.normalized_email {
        score = stagelink_core::similarity::EXACT_EMAIL_SCORE;
        reasons.push("Exact email match".to_owned());
    } else {
        let email_sim = similarity(&original.normalized_email, &duplicate.normalized_email);
        if email_sim > EMAIL_SIMILARITY_THRESHOLD {
            score = email_sim;
            reasons.push(format!("Similar email ({:.0}% match)", email_sim * 100.0));
        }
    }

    let name_sim = name_similarity(original.name.as_deref(), duplicate.name.as_deref());
    if name_sim > NAME_SIMILARITY_THRESHOLD {
        score = score.max(name_sim);
        reasons.push(format!("Similar name ({:.0}% match)", name_sim * 100.0));
    }

    if let (Some(a), Some(b)) = (&original.normalized_phone, &duplicate.normalized_phone)
        && a == b
    {
        score = score.max(PHONE_MATCH_SCORE);
        reasons.push("Same phone number".to_owned());
    }

    (score > DUPLICATE_SCORE_CUTOFF).then_some((score, reasons))
}

/// Case-folded name similarity; 0 unless both names are present.
fn name_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
            similarity(&a.to_lowercase(), &b.to_lowercase())
        }
        _ => 0.0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use stagelink_core::{Email, UserRole};

    use super::*;

    fn identity(email: &str, name: Option<&str>, phone: Option<&str>) -> Identity {
        Identity::new(
            Email::parse(email).unwrap(),
            name.map(str::to_owned),
            phone,
        )
    }

    fn user(
        email: &str,
        name: Option<&str>,
        phone: Option<&str>,
        age_days: i64,
    ) -> UserIdentity {
        UserIdentity::from_stored(
            UserId::generate(),
            email.to_owned(),
            name.map(str::to_owned),
            UserRole::Talent,
            phone,
            Utc::now() - Duration::days(age_days),
        )
    }

    #[test]
    fn test_no_candidates_is_no_match() {
        let id = identity("new@example.com", Some("New User"), None);
        let result = evaluate_candidates(&id, "new@example.com", &[], &[]);
        assert!(!result.is_duplicate);
        assert!(result.similarity_score.abs() < f64::EPSILON);
        assert!(result.matched_user_id.is_none());
    }

    #[test]
    fn test_similar_email_crosses_cutoff() {
        let existing = user("alice@test.com", None, None, 10);
        let id = identity("alice@test.co", None, None);
        let result =
            evaluate_candidates(&id, "alice@test.co", std::slice::from_ref(&existing), &[]);

        assert!(result.is_duplicate);
        assert_eq!(result.matched_user_id, Some(existing.id));
        assert!(result.similarity_score > 0.9);
        assert!(result.reason.contains("Similar email"));
    }

    #[test]
    fn test_dissimilar_email_below_cutoff() {
        let existing = user("bob@test.com", None, None, 10);
        let id = identity("alice@other.org", None, None);
        let result = evaluate_candidates(&id, "alice@other.org", &[existing], &[]);
        assert!(!result.is_duplicate);
    }

    #[test]
    fn test_similar_name_alone_triggers() {
        // Aggressive by design: near-identical names flag even with
        // unrelated emails.
        let existing = user("j.smith@corp.example", Some("Jonathan Smith"), None, 5);
        let id = identity("jsmith1988@mail.example", Some("Jonathan Smith"), None);
        let result = evaluate_candidates(
            &id,
            "jsmith1988@mail.example",
            std::slice::from_ref(&existing),
            &[],
        );

        assert!(result.is_duplicate);
        assert!(result.reason.contains("Similar name"));
    }

    #[test]
    fn test_phone_match_scores_ninety_five() {
        let other = UserId::generate();
        let id = identity("fresh@new.example", None, Some("+254700000000"));
        let result = evaluate_candidates(&id, "fresh@new.example", &[], &[other]);

        assert!(result.is_duplicate);
        assert_eq!(result.matched_user_id, Some(other));
        assert!((result.similarity_score - 0.95).abs() < f64::EPSILON);
        assert_eq!(result.reason, "Same phone number");
    }

    #[test]
    fn test_phone_upgrades_existing_candidate() {
        let existing = user("alice@test.com", None, Some("+254700000000"), 10);
        let id = identity("alice@test.co", None, Some("+254700000000"));
        let result = evaluate_candidates(
            &id,
            "alice@test.co",
            std::slice::from_ref(&existing),
            &[existing.id],
        );

        assert!(result.is_duplicate);
        assert!((result.similarity_score - 0.95).abs() < f64::EPSILON);
        assert!(result.reason.contains("Similar email"));
        assert!(result.reason.contains("Same phone number"));
    }

    #[test]
    fn test_best_candidate_wins() {
        let close = user("alice@test.cm", None, None, 10);
        let closer = user("alice@test.com", None, None, 3);
        let id = identity("alice@test.co", None, None);
        let result = evaluate_candidates(
            &id,
            "alice@test.co",
            &[close.clone(), closer.clone()],
            &[],
        );

        assert!(result.is_duplicate);
        assert_eq!(result.matched_user_id, Some(closer.id));
    }

    #[test]
    fn test_scan_reports_typo_and_phone_pair() {
        let a = user("alice@test.com", Some("Alice W"), Some("+254700000000"), 2);
        let b = user("alice@test.co", Some("Alice W"), Some("+254 700 000 000"), 1);
        let hits = find_duplicate_pairs(&[a.clone(), b.clone()]);

        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.original.id, a.id);
        assert_eq!(hit.duplicate.id, b.id);
        assert!(hit.similarity_score >= 0.95);
        assert!(hit.reasons.iter().any(|r| r == "Same phone number"));
    }

    #[test]
    fn test_scan_orders_by_age_oldest_canonical() {
        let old = user("dj.rhythm@test.com", None, None, 30);
        let new = user("dj.rhythm@test.co", None, None, 1);
        let hits = find_duplicate_pairs(&[old.clone(), new.clone()]);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].original.id, old.id);
        assert_eq!(hits[0].duplicate.id, new.id);
    }

    #[test]
    fn test_scan_skips_already_matched_email() {
        // c matches both a and b; it must only be reported once, against
        // the earliest original.
        let a = user("promoter@events.com", None, None, 30);
        let b = user("promoter@events.co", None, None, 20);
        let c = user("promoter@events.cm", None, None, 10);
        let hits = find_duplicate_pairs(&[a, b, c.clone()]);

        let c_reports: Vec<_> = hits
            .iter()
            .filter(|h| h.duplicate.id == c.id)
            .collect();
        assert_eq!(c_reports.len(), 1);
    }

    #[test]
    fn test_scan_exact_email_case_difference() {
        let a = user("Alice@Test.com", None, None, 10);
        let b = user("alice@test.COM", None, None, 5);
        let hits = find_duplicate_pairs(&[a, b]);

        assert_eq!(hits.len(), 1);
        assert!((hits[0].similarity_score - 1.0).abs() < f64::EPSILON);
        assert!(hits[0].reasons.iter().any(|r| r == "Exact email match"));
    }

    #[test]
    fn test_scan_unrelated_users_no_hits() {
        let a = user("alice@wonderland.example", Some("Alice"), None, 10);
        let b = user("bob@builder.example", Some("Bob"), None, 5);
        assert!(find_duplicate_pairs(&[a, b]).is_empty());
    }
}
