//! Paginated posting listings and customer statements

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::{EngineConfig, DEFAULT_MAX_PAGE_SIZE};
use crate::traits::PostingRecordReader;
use crate::types::*;

/// One page of the posting listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingsPage {
    /// Count of every posting record, ignoring page and filter
    pub total_postings: usize,
    /// Count per transaction type label over every record
    pub total_postings_by_type: HashMap<String, usize>,
    /// The requested page, filtered by transaction type
    pub filtered_postings: Vec<PostingRecord>,
}

/// Read-side views over posting records and the journal
pub struct PostingListing<R: PostingRecordReader> {
    reader: R,
    max_page_size: usize,
}

impl<R: PostingRecordReader> PostingListing<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_config(reader: R, config: &EngineConfig) -> Self {
        Self {
            reader,
            max_page_size: config.max_page_size,
        }
    }

    /// List postings newest first.
    ///
    /// `page_number` is 1-based. The filter is applied to the page after it is
    /// cut, so a page can hold fewer than `page_size` matches even when later
    /// pages have more.
    ///
    /// Without a filter the whole page is returned. This is a change from the
    /// earlier postings service, which matched no rows when the filter was missing.
    pub async fn list_postings(
        &self,
        page_number: usize,
        page_size: usize,
        filter_value: Option<&str>,
    ) -> PostingResult<PostingsPage> {
        if page_number == 0 {
            return Err(PostingError::Validation(
                "Page number starts at 1".to_string(),
            ));
        }
        if page_size == 0 {
            return Err(PostingError::Validation(
                "Page size must be at least 1".to_string(),
            ));
        }
        let page_size = page_size.min(self.max_page_size);

        let total_postings = self.reader.count_postings().await?;
        let total_postings_by_type = self.reader.count_postings_by_type().await?;
        let page = self
            .reader
            .postings_page((page_number - 1).saturating_mul(page_size), page_size)
            .await?;
        let page_len = page.len();

        let filtered_postings: Vec<PostingRecord> = match filter_value {
            Some(filter) => page
                .into_iter()
                .filter(|record| record.transaction_type.matches_label(filter))
                .collect(),
            None => page,
        };

        tracing::debug!(
            page_number,
            page_size,
            filter = filter_value.unwrap_or(""),
            page_len,
            matched = filtered_postings.len(),
            total_postings,
            "postings listed"
        );

        Ok(PostingsPage {
            total_postings,
            total_postings_by_type,
            filtered_postings,
        })
    }

    /// Journal entries for a customer, newest first
    pub async fn statement(&self, customer_id: Uuid) -> PostingResult<Vec<Transaction>> {
        self.reader.transactions_for_customer(customer_id).await
    }
}
