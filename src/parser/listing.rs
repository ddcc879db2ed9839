use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::contact::extract_contact;
use super::normalize_whitespace;
use crate::error::EntityError;
use crate::store::Record;
use crate::work::WorkItem;

static AGENT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.directoryAgent").unwrap());
static NAME_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.directoryAgentName").unwrap());
static ADDRESS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.directoryAgentAddress > p").unwrap());
static CONTACT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.directoryAgentInfo > p").unwrap());

/// Extract one record per agency listing block on a city page.
///
/// Blocks without a name are skipped; their siblings are still returned.
pub fn extract_records(html: &str, item: &WorkItem) -> Vec<Record> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for (index, block) in document.select(&AGENT_SEL).enumerate() {
        match extract_listing(block, item) {
            Ok(record) => {
                debug!(url = %item.url, "{:?}", record);
                records.push(record);
            }
            Err(e) => debug!(url = %item.url, block = index, "Skipping listing: {}", e),
        }
    }

    records
}

fn extract_listing(block: ElementRef<'_>, item: &WorkItem) -> Result<Record, EntityError> {
    let company_name = text_of(block, &NAME_SEL)
        .filter(|name| !name.is_empty())
        .ok_or(EntityError::MissingField("name"))?;
    let address = text_of(block, &ADDRESS_SEL).unwrap_or_default();
    let contact = extract_contact(&text_of(block, &CONTACT_SEL).unwrap_or_default());

    Ok(Record {
        state: item.state.clone(),
        city: item.city.clone(),
        company_name,
        address,
        phone: contact.phone,
        fax: contact.fax,
        email: contact.email,
    })
}

fn text_of(block: ElementRef<'_>, selector: &Selector) -> Option<String> {
    block
        .select(selector)
        .next()
        .map(|node| normalize_whitespace(&node.text().collect::<Vec<_>>().join(" ")))
}
