/// The four transfer streams and their shared batch machinery.
use crate::db::{post_repo, subscription_repo, user_repo, vote_repo};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::migration::link::{self, Relations};
use crate::migration::source;
use crate::models::{PostStatus, PostType, SubType, VoteType};
use crate::util::split_tags;
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

/// Per-stream outcome of a transfer run.
#[derive(Debug, Clone, Default)]
pub struct StreamReport {
    pub stream: &'static str,
    pub copied: u64,
    pub skipped: u64,
    pub linked: u64,
    pub orphaned: u64,
}

/// Elapsed-time progress logging, emitted every `step` records.
struct Progress {
    stream: &'static str,
    step: usize,
    seen: usize,
    started: Instant,
}

impl Progress {
    fn new(stream: &'static str, step: usize) -> Self {
        Self {
            stream,
            step: step.max(1),
            seen: 0,
            started: Instant::now(),
        }
    }

    fn tick(&mut self, records: usize) {
        let before = self.seen / self.step;
        self.seen += records;
        if self.seen / self.step > before {
            tracing::info!(
                stream = self.stream,
                records = self.seen,
                elapsed_secs = self.started.elapsed().as_secs(),
                "transfer progress"
            );
        }
    }

    fn finish(&self, report: &StreamReport) {
        tracing::info!(
            stream = self.stream,
            copied = report.copied,
            skipped = report.skipped,
            linked = report.linked,
            orphaned = report.orphaned,
            elapsed_secs = self.started.elapsed().as_secs(),
            "transfer stream finished"
        );
    }
}

pub struct MigrationPipeline {
    target: PgPool,
    source: PgPool,
    batch_size: usize,
    progress_step: usize,
}

impl MigrationPipeline {
    pub fn new(target: PgPool, source: PgPool, batch_size: usize, progress_step: usize) -> Self {
        Self {
            target,
            source,
            batch_size,
            progress_step,
        }
    }

    /// Copy user accounts. Runs first: every other stream resolves its
    /// author through the user uid map this stream fills.
    pub async fn copy_users(&self) -> Result<StreamReport> {
        let mut report = StreamReport {
            stream: "users",
            ..Default::default()
        };
        let mut progress = Progress::new("users", self.progress_step);

        let existing = user_repo::existing_uids(&self.target).await?;

        let mut last_id = 0i64;
        loop {
            let rows =
                source::fetch_users_after(&self.source, last_id, self.batch_size as i64).await?;
            if rows.is_empty() {
                break;
            }
            last_id = rows[rows.len() - 1].id;

            let mut batch = Vec::with_capacity(rows.len());
            for user in &rows {
                let uid = user.id.to_string();
                if existing.contains(&uid) {
                    report.skipped += 1;
                    record_outcome("users", "skipped");
                    continue;
                }
                batch.push(user_repo::MigratedUser {
                    uid,
                    username: user.username.clone(),
                    email: user.email.clone(),
                    score: user.score,
                    new_messages: user.new_messages,
                    is_active: user.is_active,
                    date_joined: user.date_joined,
                });
            }

            let inserted = user_repo::insert_migrated(&self.target, &batch).await?;
            report.copied += inserted;
            record_outcome_n("users", "copied", inserted);
            progress.tick(rows.len());
        }

        progress.finish(&report);
        Ok(report)
    }

    /// Copy posts in two passes: create every row with root/parent unset,
    /// then link the tree once the uid map is complete.
    pub async fn copy_posts(&self) -> Result<StreamReport> {
        let mut report = StreamReport {
            stream: "posts",
            ..Default::default()
        };
        let mut progress = Progress::new("posts", self.progress_step);

        let existing = post_repo::existing_uids(&self.target).await?;
        let users = legacy_id_map(user_repo::uid_map(&self.target).await?);

        // Legacy tree edges, recorded for every readable source row so a
        // restarted run can re-link posts created before a crash.
        let mut relations = Relations::new();

        let mut last_id = 0i64;
        loop {
            let rows =
                source::fetch_posts_after(&self.source, last_id, self.batch_size as i64).await?;
            if rows.is_empty() {
                break;
            }
            last_id = rows[rows.len() - 1].id;

            let mut batch = Vec::with_capacity(rows.len());
            for post in &rows {
                let Some(&author_id) = users.get(&post.author_id) else {
                    tracing::warn!(
                        legacy_id = post.id,
                        legacy_author = post.author_id,
                        "skipping post with unresolvable author"
                    );
                    report.skipped += 1;
                    record_outcome("posts", "skipped");
                    continue;
                };
                let (Some(ptype), Some(status)) = (
                    PostType::from_i16(post.ptype),
                    PostStatus::from_i16(post.status),
                ) else {
                    tracing::warn!(
                        legacy_id = post.id,
                        ptype = post.ptype,
                        status = post.status,
                        "skipping post with unknown type or status"
                    );
                    report.skipped += 1;
                    record_outcome("posts", "skipped");
                    continue;
                };

                relations.insert(post.id, (post.root_id, post.parent_id));

                let uid = post.id.to_string();
                if existing.contains(&uid) {
                    report.skipped += 1;
                    record_outcome("posts", "skipped");
                    continue;
                }

                let lastedit_author_id = post
                    .lastedit_user_id
                    .and_then(|id| users.get(&id).copied())
                    .unwrap_or(author_id);

                batch.push(post_repo::MigratedPost {
                    uid,
                    title: post.title.clone(),
                    author_id,
                    lastedit_author_id,
                    ptype,
                    status,
                    vote_count: post.vote_count,
                    view_count: post.view_count,
                    reply_count: post.reply_count,
                    book_count: post.book_count,
                    has_accepted: post.has_accepted,
                    tag_val: post.tag_val.clone(),
                    tags: split_tags(&post.tag_val),
                    content: post.content.clone(),
                    html: post.html.clone(),
                    creation_date: post.creation_date,
                    lastedit_date: post.lastedit_date,
                });
            }

            let inserted = post_repo::insert_migrated(&self.target, &batch).await?;
            report.copied += inserted;
            record_outcome_n("posts", "copied", inserted);
            progress.tick(rows.len());
        }

        self.link_posts(&relations, &mut report).await?;

        post_repo::reconcile_reply_counts(&self.target).await?;
        post_repo::reconcile_comment_counts(&self.target).await?;

        progress.finish(&report);
        Ok(report)
    }

    async fn link_posts(&self, relations: &Relations, report: &mut StreamReport) -> Result<()> {
        let posts = legacy_id_map(post_repo::uid_map(&self.target).await?);
        let (links, orphans) = link::resolve_relations(relations, &posts);

        for chunk in links.chunks(self.batch_size) {
            report.linked += post_repo::update_links(&self.target, chunk).await?;
        }

        for &legacy_id in &orphans {
            tracing::warn!(legacy_id, "post left orphaned after linking");
            record_outcome("posts", "orphaned");
        }
        report.orphaned += orphans.len() as u64;

        let unlinked = post_repo::count_unlinked(&self.target).await?;
        if unlinked > report.orphaned as i64 {
            return Err(AppError::Consistency(format!(
                "{} posts still unlinked after transfer, {} expected orphans",
                unlinked,
                report.orphaned
            )));
        }
        Ok(())
    }

    /// Copy votes, then recompute thread scores from the full vote set.
    pub async fn copy_votes(&self) -> Result<StreamReport> {
        let mut report = StreamReport {
            stream: "votes",
            ..Default::default()
        };
        let mut progress = Progress::new("votes", self.progress_step);

        let existing = vote_repo::existing_uids(&self.target).await?;
        let users = legacy_id_map(user_repo::uid_map(&self.target).await?);
        let posts = legacy_id_map(post_repo::uid_map(&self.target).await?);

        let mut last_id = 0i64;
        loop {
            let rows =
                source::fetch_votes_after(&self.source, last_id, self.batch_size as i64).await?;
            if rows.is_empty() {
                break;
            }
            last_id = rows[rows.len() - 1].id;

            let mut batch = Vec::with_capacity(rows.len());
            for vote in &rows {
                let uid = vote.id.to_string();
                if existing.contains(&uid) {
                    report.skipped += 1;
                    record_outcome("votes", "skipped");
                    continue;
                }
                let (Some(&author_id), Some(&post_id), Some(vtype)) = (
                    users.get(&vote.author_id),
                    posts.get(&vote.post_id),
                    VoteType::from_i16(vote.vtype),
                ) else {
                    tracing::warn!(legacy_id = vote.id, "skipping unresolvable vote");
                    report.skipped += 1;
                    record_outcome("votes", "skipped");
                    continue;
                };
                batch.push(vote_repo::MigratedVote {
                    uid,
                    post_id,
                    author_id,
                    vtype,
                    date: vote.date,
                });
            }

            let inserted = vote_repo::insert_migrated(&self.target, &batch).await?;
            report.copied += inserted;
            record_outcome_n("votes", "copied", inserted);
            progress.tick(rows.len());
        }

        post_repo::reconcile_thread_scores(&self.target).await?;

        progress.finish(&report);
        Ok(report)
    }

    /// Copy subscriptions, then recompute subscriber counts on the roots.
    pub async fn copy_subs(&self) -> Result<StreamReport> {
        let mut report = StreamReport {
            stream: "subs",
            ..Default::default()
        };
        let mut progress = Progress::new("subs", self.progress_step);

        let existing = subscription_repo::existing_uids(&self.target).await?;
        let users = legacy_id_map(user_repo::uid_map(&self.target).await?);
        let posts = legacy_id_map(post_repo::uid_map(&self.target).await?);

        let mut last_id = 0i64;
        loop {
            let rows =
                source::fetch_subs_after(&self.source, last_id, self.batch_size as i64).await?;
            if rows.is_empty() {
                break;
            }
            last_id = rows[rows.len() - 1].id;

            let mut batch = Vec::with_capacity(rows.len());
            for sub in &rows {
                let uid = sub.id.to_string();
                if existing.contains(&uid) {
                    report.skipped += 1;
                    record_outcome("subs", "skipped");
                    continue;
                }
                let (Some(&user_id), Some(&post_id), Some(stype)) = (
                    users.get(&sub.user_id),
                    posts.get(&sub.post_id),
                    SubType::from_i16(sub.stype),
                ) else {
                    tracing::warn!(legacy_id = sub.id, "skipping unresolvable subscription");
                    report.skipped += 1;
                    record_outcome("subs", "skipped");
                    continue;
                };
                batch.push(subscription_repo::MigratedSub {
                    uid,
                    user_id,
                    post_id,
                    stype,
                    date: sub.date,
                });
            }

            let inserted = subscription_repo::insert_migrated(&self.target, &batch).await?;
            report.copied += inserted;
            record_outcome_n("subs", "copied", inserted);
            progress.tick(rows.len());
        }

        subscription_repo::reconcile_subs_counts(&self.target).await?;

        progress.finish(&report);
        Ok(report)
    }

    /// Run the selected streams in the fixed order Users, Posts, Votes,
    /// Subscriptions.
    pub async fn run(&self, opts: super::MigrateOpts) -> Result<Vec<StreamReport>> {
        let opts = if opts.is_empty() {
            super::MigrateOpts::all()
        } else {
            opts
        };

        let mut reports = Vec::new();
        if opts.users {
            reports.push(self.copy_users().await?);
        }
        if opts.posts {
            reports.push(self.copy_posts().await?);
        }
        if opts.votes {
            reports.push(self.copy_votes().await?);
        }
        if opts.subs {
            reports.push(self.copy_subs().await?);
        }

        let total_posts = post_repo::count_all(&self.target).await?;
        let total_users = user_repo::count_all(&self.target).await?;
        let total_votes = vote_repo::count_all(&self.target).await?;
        let total_subs = subscription_repo::count_all(&self.target).await?;
        tracing::info!(
            users = total_users,
            posts = total_posts,
            votes = total_votes,
            subs = total_subs,
            "transfer complete"
        );

        Ok(reports)
    }
}

/// Turn a uid map keyed by stringified legacy ids into a numeric map.
/// Uids minted by the service itself are not numeric and fall out here.
fn legacy_id_map(uids: HashMap<String, Uuid>) -> HashMap<i64, Uuid> {
    uids.into_iter()
        .filter_map(|(uid, id)| uid.parse::<i64>().ok().map(|legacy| (legacy, id)))
        .collect()
}

fn record_outcome(stream: &str, outcome: &str) {
    metrics::TRANSFER_RECORDS_TOTAL
        .with_label_values(&[stream, outcome])
        .inc();
}

fn record_outcome_n(stream: &str, outcome: &str, n: u64) {
    metrics::TRANSFER_RECORDS_TOTAL
        .with_label_values(&[stream, outcome])
        .inc_by(n);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_id_map_drops_service_minted_uids() {
        let mut uids = HashMap::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        uids.insert("42".to_string(), a);
        uids.insert("k3j2h1g4f5d6e".to_string(), b);

        let map = legacy_id_map(uids);

        assert_eq!(map.len(), 1);
        assert_eq!(map[&42], a);
    }

    #[test]
    fn progress_logs_only_on_step_boundaries() {
        let mut progress = Progress::new("users", 100);
        progress.tick(99);
        assert_eq!(progress.seen, 99);
        progress.tick(1);
        assert_eq!(progress.seen, 100);
    }
}
