//! Paged enumeration of a list's member addresses.

use futures_util::{Stream, TryStreamExt, stream};
use log::debug;
use serde_json::Value;

use crate::http::RequestError;
use crate::logger::Logger;

use super::api::MarketingApi;
use super::client::MailchimpClient;

/// Cursor over the email addresses of one list.
///
/// Pages are fetched on demand at `offset`, `offset + page_size`, ... until a
/// page comes back without members. Each fetch goes through the client's
/// gateway-timeout retry. Not resumable: a failed fetch ends the cursor.
pub struct ListMembers<'a, A: MarketingApi, L: Logger> {
    client: &'a MailchimpClient<A, L>,
    list_id: String,
    page_size: usize,
    offset: usize,
    finished: bool,
}

impl<'a, A: MarketingApi, L: Logger> ListMembers<'a, A, L> {
    pub(super) fn new(client: &'a MailchimpClient<A, L>, list_id: &str, page_size: usize) -> Self {
        Self {
            client,
            list_id: list_id.to_string(),
            // A zero page size would never advance the offset.
            page_size: page_size.max(1),
            offset: 0,
            finished: false,
        }
    }

    pub fn has_next(&self) -> bool {
        !self.finished
    }

    /// Fetches the next page. `Ok(None)` once the list is exhausted.
    #[tracing::instrument(skip(self))]
    pub async fn next_batch(&mut self) -> Result<Option<Vec<String>>, RequestError> {
        if self.finished {
            return Ok(None);
        }

        let client = self.client;
        let list_id = self.list_id.as_str();
        let (count, offset) = (self.page_size, self.offset);

        let page = match client
            .timeout_retry(|| client.api().list_members(list_id, count, offset))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        let members = match page.get("members").and_then(Value::as_array) {
            Some(members) if !members.is_empty() => members,
            _ => {
                debug!("No more members in list {} at offset {}", list_id, offset);
                self.finished = true;
                return Ok(None);
            }
        };

        let emails = members
            .iter()
            .map(|member| {
                member
                    .get("email_address")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| {
                        RequestError::InvalidResponse(
                            "list member without an email_address".to_string(),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>();

        match emails {
            Ok(emails) => {
                self.offset += self.page_size;
                Ok(Some(emails))
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Flattens the pages into a stream of addresses. A failed page fetch is
    /// yielded as the stream's last item.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, RequestError>> + 'a {
        stream::try_unfold(self, |mut cursor| async move {
            let batch = cursor.next_batch().await?;
            Ok::<_, RequestError>(batch.map(|emails| {
                (
                    stream::iter(emails.into_iter().map(Ok::<_, RequestError>)),
                    cursor,
                )
            }))
        })
        .try_flatten()
    }
}
