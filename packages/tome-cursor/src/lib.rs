//! Opaque pagination cursors for keyset listing.
//!
//! A cursor carries the `(id, timestamp)` of the last row a caller has seen.
//! Queries that consume one must scan in a strictly monotonic
//! `(timestamp, id)` compound order and resume strictly after the boundary
//! row, using the id to break timestamp ties. Offsets are never used, so
//! pages stay stable under concurrent inserts and deletes.

mod error;

pub use error::{Error, Result};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Decoded boundary of the previously returned page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
	pub last_id: String,
	pub timestamp: OffsetDateTime,
}

/// Encodes a pagination boundary as an opaque, URL-safe token.
///
/// An empty `last_id` means "nothing to continue from" and yields an empty
/// string.
pub fn encode_cursor(last_id: &str, timestamp: OffsetDateTime) -> String {
	if last_id.is_empty() {
		return String::new();
	}

	let Ok(ts) = timestamp.to_offset(time::UtcOffset::UTC).format(&Rfc3339) else {
		// Rfc3339 only covers years 0..=9999. Outside that range there is no
		// representable boundary, which callers already treat as "no cursor".
		return String::new();
	};

	URL_SAFE_NO_PAD.encode(format!("{last_id}|{ts}"))
}

/// Decodes a cursor produced by [`encode_cursor`].
///
/// Empty input is "no cursor supplied" and returns `Ok(None)`. Any non-empty
/// input that cannot be decoded fails with [`Error::InvalidCursor`]; the
/// failing sub-step is deliberately not distinguishable.
pub fn decode_cursor(cursor: &str) -> Result<Option<Cursor>> {
	if cursor.is_empty() {
		return Ok(None);
	}

	let raw = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| Error::InvalidCursor)?;
	let text = String::from_utf8(raw).map_err(|_| Error::InvalidCursor)?;
	let (last_id, ts) = text.split_once('|').ok_or(Error::InvalidCursor)?;

	if last_id.is_empty() {
		return Err(Error::InvalidCursor);
	}

	let timestamp = OffsetDateTime::parse(ts, &Rfc3339).map_err(|_| Error::InvalidCursor)?;

	Ok(Some(Cursor { last_id: last_id.to_string(), timestamp }))
}

/// Produces the continuation token for a page of `items` fetched with `limit`.
///
/// A page shorter than the requested limit means the scan is exhausted and
/// there is no next page, regardless of any total-count expectations.
pub fn next_cursor<T>(
	items: &[T],
	limit: usize,
	id_of: impl Fn(&T) -> String,
	time_of: impl Fn(&T) -> OffsetDateTime,
) -> String {
	if items.len() < limit {
		return String::new();
	}

	let Some(last) = items.last() else {
		return String::new();
	};

	encode_cursor(&id_of(last), time_of(last))
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	struct Row {
		id: String,
		updated_at: OffsetDateTime,
	}

	fn rows(n: usize) -> Vec<Row> {
		(0..n)
			.map(|idx| Row {
				id: format!("row-{idx}"),
				updated_at: datetime!(2025-06-01 12:00:00 UTC) + time::Duration::seconds(idx as i64),
			})
			.collect()
	}

	#[test]
	fn round_trips_id_and_timestamp() {
		let ts = datetime!(2025-06-01 12:34:56.789 UTC);
		let token = encode_cursor("note-42", ts);
		let cursor = decode_cursor(&token).expect("decode failed").expect("cursor missing");

		assert_eq!(cursor.last_id, "note-42");
		assert_eq!(cursor.timestamp, ts);
	}

	#[test]
	fn normalizes_offset_to_utc() {
		let ts = datetime!(2025-06-01 14:00:00 +2);
		let token = encode_cursor("note-1", ts);
		let cursor = decode_cursor(&token).expect("decode failed").expect("cursor missing");

		assert_eq!(cursor.timestamp, datetime!(2025-06-01 12:00:00 UTC));
	}

	#[test]
	fn empty_last_id_encodes_to_empty_token() {
		assert_eq!(encode_cursor("", datetime!(2025-06-01 0:00 UTC)), "");
	}

	#[test]
	fn empty_token_decodes_to_none() {
		assert_eq!(decode_cursor("").expect("decode failed"), None);
	}

	#[test]
	fn garbage_input_is_invalid() {
		assert!(matches!(decode_cursor("not-base64!!"), Err(Error::InvalidCursor)));
	}

	#[test]
	fn valid_base64_without_delimiter_is_invalid() {
		let token = URL_SAFE_NO_PAD.encode("no delimiter here");

		assert!(matches!(decode_cursor(&token), Err(Error::InvalidCursor)));
	}

	#[test]
	fn unparseable_timestamp_is_invalid() {
		let token = URL_SAFE_NO_PAD.encode("note-1|yesterday");

		assert!(matches!(decode_cursor(&token), Err(Error::InvalidCursor)));
	}

	#[test]
	fn non_utf8_payload_is_invalid() {
		let token = URL_SAFE_NO_PAD.encode([0xff_u8, 0xfe, 0x7c, 0x30]);

		assert!(matches!(decode_cursor(&token), Err(Error::InvalidCursor)));
	}

	#[test]
	fn short_page_has_no_next_cursor() {
		let page = rows(3);

		assert_eq!(next_cursor(&page, 5, |row| row.id.clone(), |row| row.updated_at), "");
	}

	#[test]
	fn empty_page_has_no_next_cursor() {
		let page = rows(0);

		assert_eq!(next_cursor(&page, 1, |row| row.id.clone(), |row| row.updated_at), "");
	}

	#[test]
	fn full_page_continues_from_last_row() {
		let page = rows(5);
		let token = next_cursor(&page, 5, |row| row.id.clone(), |row| row.updated_at);
		let cursor = decode_cursor(&token).expect("decode failed").expect("cursor missing");

		assert_eq!(cursor.last_id, "row-4");
		assert_eq!(cursor.timestamp, page[4].updated_at);
	}
}
