//! Thread service
//!
//! Renders one page of a forum post: messages grouped by consecutive author,
//! with prev/next cursors.

use forum_cache::MemberResolver;
use forum_core::entities::{Channel, Message};
use forum_core::Snowflake;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::dto::{AuthorGroup, ChannelSummary, GuildSummary, MessageView, PageRequest, ThreadPage};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Thread (forum post) service
pub struct ThreadService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ThreadService<'a> {
    /// Create a new ThreadService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Render one page of a post
    ///
    /// Member lookup is bounded by `deadline`; if it fails the page is still
    /// rendered with the identities embedded in the messages.
    #[instrument(skip_all, fields(guild_id = %guild_id, channel_id = %channel_id))]
    pub async fn thread_page(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
        request: PageRequest,
        deadline: Instant,
    ) -> ServiceResult<ThreadPage> {
        let guild = self.ctx.directory().guild(guild_id).await?;
        let (post, forum) = self.post(guild_id, channel_id).await?;

        let page = self
            .ctx
            .pagination()
            .page(
                channel_id,
                request.cursor,
                request.direction,
                self.ctx.config().page_size,
            )
            .await?;

        let members_resolved = match self
            .ctx
            .members()
            .ensure(guild_id, channel_id, &page.messages, deadline)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "member lookup failed, rendering fallback identities");
                false
            }
        };

        let groups = group_messages(self.ctx.members(), guild_id, &page.messages);
        info!(
            messages = page.messages.len(),
            groups = groups.len(),
            has_before = page.has_before,
            has_after = page.has_after,
            "thread page rendered"
        );

        Ok(ThreadPage {
            guild: GuildSummary::from(&guild),
            post: match &forum {
                Some(forum) => ChannelSummary::post(&post, forum),
                None => ChannelSummary::from(&post),
            },
            groups,
            prev: page.prev_cursor().map(|id| id.to_string()),
            next: page.next_cursor().map(|id| id.to_string()),
            members_resolved,
        })
    }

    /// Look up a post and its parent forum, refusing NSFW content
    async fn post(
        &self,
        guild_id: Snowflake,
        channel_id: Snowflake,
    ) -> ServiceResult<(Channel, Option<Channel>)> {
        let post = self.ctx.directory().channel(channel_id).await?;
        if post.guild_id != Some(guild_id) || !post.is_thread() {
            return Err(ServiceError::not_found("Post", channel_id.to_string()));
        }

        let forum = match post.parent_id {
            Some(parent_id) => Some(self.ctx.directory().channel(parent_id).await?),
            None => None,
        };
        if post.nsfw || forum.as_ref().is_some_and(|f| f.nsfw) {
            return Err(ServiceError::forbidden("NSFW content is not served"));
        }
        Ok((post, forum))
    }
}

/// Group consecutive messages by the same author
pub fn group_messages(
    members: &MemberResolver,
    guild_id: Snowflake,
    messages: &[Message],
) -> Vec<AuthorGroup> {
    let mut groups: Vec<AuthorGroup> = Vec::new();
    for message in messages {
        match groups.last_mut() {
            Some(group) if group.author.id == message.author.id => {
                group.messages.push(MessageView::from(message));
            }
            _ => groups.push(AuthorGroup {
                author: members.author(guild_id, &message.author),
                messages: vec![MessageView::from(message)],
            }),
        }
    }
    groups
}
