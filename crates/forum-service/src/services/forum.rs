//! Forum service
//!
//! Guild overview of forum channels and paged post listings.

use forum_core::entities::Channel;
use forum_core::Snowflake;
use tracing::{info, instrument};

use crate::dto::{ChannelSummary, ForumOverview, ForumSummary, GuildSummary, PostPage};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Forum service
pub struct ForumService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ForumService<'a> {
    /// Create a new ForumService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Forum channels of a guild, most recently active first
    #[instrument(skip(self, guild_id), fields(guild_id = %guild_id))]
    pub async fn forum_overview(&self, guild_id: Snowflake) -> ServiceResult<ForumOverview> {
        let guild = self.ctx.directory().guild(guild_id).await?;
        let channels = self.ctx.directory().guild_channels(guild_id).await?;

        let mut forums: Vec<ForumSummary> = channels
            .iter()
            .filter(|c| c.is_forum())
            .map(|forum| {
                let posts: Vec<&Channel> = posts_of(&channels, forum.id).collect();
                ForumSummary {
                    forum: ChannelSummary::from(forum),
                    message_count: posts.iter().map(|p| u64::from(p.message_count)).sum(),
                    last_active: posts
                        .iter()
                        .filter_map(|p| p.last_active())
                        .chain(forum.last_active())
                        .max(),
                    posts: posts.iter().map(|p| ChannelSummary::post(p, forum)).collect(),
                }
            })
            .collect();
        // Never-active forums sort last
        forums.sort_by(|a, b| b.last_active.cmp(&a.last_active));

        info!(forums = forums.len(), "forum overview built");
        Ok(ForumOverview {
            guild: GuildSummary::from(&guild),
            forums,
        })
    }

    /// One page of a forum's posts, pinned first then most recently active
    ///
    /// Page numbers start at 1; anything lower is treated as 1.
    #[instrument(skip(self, guild_id, forum_id), fields(guild_id = %guild_id, forum_id = %forum_id))]
    pub async fn forum_posts(
        &self,
        guild_id: Snowflake,
        forum_id: Snowflake,
        page: u32,
    ) -> ServiceResult<PostPage> {
        let guild = self.ctx.directory().guild(guild_id).await?;
        let forum = self.forum(guild_id, forum_id).await?;
        let channels = self.ctx.directory().guild_channels(guild_id).await?;

        let mut posts: Vec<&Channel> = posts_of(&channels, forum.id).collect();
        posts.sort_by(|a, b| {
            b.is_pinned()
                .cmp(&a.is_pinned())
                .then_with(|| b.last_active().cmp(&a.last_active()))
        });

        let per_page = self.ctx.config().page_size.max(1);
        let page = page.max(1);
        let start = (page as usize - 1).saturating_mul(per_page);

        Ok(PostPage {
            guild: GuildSummary::from(&guild),
            prev: (page > 1).then(|| page - 1),
            next: (posts.len() > start.saturating_add(per_page)).then(|| page + 1),
            posts: posts
                .iter()
                .skip(start)
                .take(per_page)
                .map(|p| ChannelSummary::post(p, &forum))
                .collect(),
            forum: ChannelSummary::from(&forum),
            page,
        })
    }

    /// Look up a forum channel of the guild, refusing NSFW forums
    async fn forum(&self, guild_id: Snowflake, forum_id: Snowflake) -> ServiceResult<Channel> {
        let forum = self.ctx.directory().channel(forum_id).await?;
        if forum.guild_id != Some(guild_id) || !forum.is_forum() {
            return Err(ServiceError::not_found("Forum", forum_id.to_string()));
        }
        if forum.nsfw {
            return Err(ServiceError::forbidden("NSFW content is not served"));
        }
        Ok(forum)
    }
}

/// Public threads posted in a forum
fn posts_of(channels: &[Channel], forum_id: Snowflake) -> impl Iterator<Item = &Channel> {
    channels
        .iter()
        .filter(move |c| c.is_public_thread() && c.parent_id == Some(forum_id))
}
