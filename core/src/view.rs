/// View formatting: message list -> date-grouped render groups
///
/// Pure functions. The same messages and options always produce the same output,
/// which is why "today" and the UTC offset are inputs rather than read from the clock.
use crate::chat_types::{ConversationSnapshot, Message, MessageId, MessageKind};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStyle {
    /// "09:05 PM"
    #[default]
    TwelveHour,
    /// "21:05"
    TwentyFourHour,
}

impl ClockStyle {
    fn pattern(self) -> &'static str {
        match self {
            ClockStyle::TwelveHour => "%I:%M %p",
            ClockStyle::TwentyFourHour => "%H:%M",
        }
    }
}

/// Read-receipt indicator, shown on locally sent messages only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadReceipt {
    Sent,
    Read,
}

impl ReadReceipt {
    /// Icon class for the view layer
    pub fn icon(self) -> &'static str {
        match self {
            ReadReceipt::Sent => "checkmark",
            ReadReceipt::Read => "checkmark-done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderItem {
    pub message_id: MessageId,
    pub kind: MessageKind,
    pub body: String,
    pub time_label: String,
    pub originated_locally: bool,
    pub receipt: Option<ReadReceipt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderGroup {
    pub date: NaiveDate,
    pub header: String,
    pub items: Vec<RenderItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Calendar days and clock labels are computed in this offset
    pub offset: FixedOffset,
    pub clock_style: ClockStyle,
    /// Enables "Today"/"Yesterday" headers when set
    pub today: Option<NaiveDate>,
}

impl FormatOptions {
    pub fn utc(clock_style: ClockStyle) -> Self {
        Self {
            offset: Utc.fix(),
            clock_style,
            today: None,
        }
    }

    /// Device-local offset and date, captured once
    pub fn local(clock_style: ClockStyle) -> Self {
        let now = Local::now();
        Self {
            offset: *now.offset(),
            clock_style,
            today: Some(now.date_naive()),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

/// Group consecutive messages by calendar day. A new group starts whenever a
/// message's day differs from the previous message's day.
pub fn format(messages: &[Message], options: &FormatOptions) -> Vec<RenderGroup> {
    let mut groups: Vec<RenderGroup> = Vec::new();

    for message in messages {
        let at = message.created_at.with_timezone(&options.offset);
        let date = at.date_naive();
        let item = render_item(message, &at, options.clock_style);

        match groups.last_mut() {
            Some(group) if group.date == date => group.items.push(item),
            _ => groups.push(RenderGroup {
                date,
                header: date_header(date, options.today),
                items: vec![item],
            }),
        }
    }

    groups
}

pub fn format_snapshot(snapshot: &ConversationSnapshot, options: &FormatOptions) -> Vec<RenderGroup> {
    format(&snapshot.messages, options)
}

/// "Sarah Johnson is typing..." while the remote side is typing
pub fn typing_label(snapshot: &ConversationSnapshot) -> Option<String> {
    snapshot
        .is_typing_remote
        .then(|| format!("{} is typing...", snapshot.participant.display_name))
}

fn render_item(message: &Message, at: &DateTime<FixedOffset>, clock_style: ClockStyle) -> RenderItem {
    let receipt = message.originated_locally.then_some(if message.is_read {
        ReadReceipt::Read
    } else {
        ReadReceipt::Sent
    });

    RenderItem {
        message_id: message.id,
        kind: message.kind(),
        body: message.content.preview(),
        time_label: at.format(clock_style.pattern()).to_string(),
        originated_locally: message.originated_locally,
        receipt,
    }
}

fn date_header(date: NaiveDate, today: Option<NaiveDate>) -> String {
    match today {
        Some(today) if today == date => "Today".to_string(),
        Some(today) if today.pred_opt() == Some(date) => "Yesterday".to_string(),
        _ => date.format("%B %-d, %Y").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_types::{AttachmentDescriptor, MessageContent, MimeKind};
    use chrono::TimeZone;

    fn message(id: u64, day: u32, hour: u32, local: bool, read: bool) -> Message {
        Message {
            id: MessageId(id),
            content: MessageContent::text(format!("message {}", id)),
            created_at: Utc.with_ymd_and_hms(2026, 5, day, hour, 5, 0).unwrap(),
            originated_locally: local,
            is_read: read,
        }
    }

    fn utc() -> FormatOptions {
        FormatOptions::utc(ClockStyle::TwelveHour)
    }

    #[test]
    fn test_three_then_two_gives_two_groups() {
        let messages = vec![
            message(1, 10, 9, true, false),
            message(2, 10, 10, false, true),
            message(3, 10, 21, true, true),
            message(4, 11, 8, false, false),
            message(5, 11, 9, true, false),
        ];

        let groups = format(&messages, &utc());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].items.len(), 3);
        assert_eq!(groups[1].items.len(), 2);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2026, 5, 10).unwrap());
        assert_eq!(groups[0].header, "May 10, 2026");
    }

    #[test]
    fn test_empty_input_gives_no_groups() {
        assert!(format(&[], &utc()).is_empty());
    }

    #[test]
    fn test_receipts_only_on_local_messages() {
        let messages = vec![
            message(1, 10, 9, true, false),
            message(2, 10, 9, true, true),
            message(3, 10, 9, false, false),
        ];
        let items = &format(&messages, &utc())[0].items;
        assert_eq!(items[0].receipt, Some(ReadReceipt::Sent));
        assert_eq!(items[1].receipt, Some(ReadReceipt::Read));
        assert_eq!(items[2].receipt, None);
        assert_eq!(ReadReceipt::Read.icon(), "checkmark-done");
    }

    #[test]
    fn test_time_labels_follow_clock_style() {
        let messages = vec![message(1, 10, 21, false, true)];
        let twelve = format(&messages, &utc());
        assert_eq!(twelve[0].items[0].time_label, "09:05 PM");

        let twenty_four = format(&messages, &FormatOptions::utc(ClockStyle::TwentyFourHour));
        assert_eq!(twenty_four[0].items[0].time_label, "21:05");
    }

    #[test]
    fn test_offset_moves_messages_across_midnight() {
        // 23:05 UTC on the 10th is 01:05 on the 11th at +02:00
        let messages = vec![message(1, 10, 22, false, true), message(2, 10, 23, false, true)];
        let options = FormatOptions {
            offset: FixedOffset::east_opt(2 * 3600).unwrap(),
            clock_style: ClockStyle::TwentyFourHour,
            today: None,
        };
        let groups = format(&messages, &options);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2026, 5, 11).unwrap());
        assert_eq!(groups[0].items[1].time_label, "01:05");
    }

    #[test]
    fn test_today_and_yesterday_headers() {
        let messages = vec![
            message(1, 9, 9, false, true),
            message(2, 10, 9, false, true),
            message(3, 11, 9, false, true),
        ];
        let options = utc().with_today(NaiveDate::from_ymd_opt(2026, 5, 11).unwrap());
        let headers: Vec<String> = format(&messages, &options)
            .into_iter()
            .map(|g| g.header)
            .collect();
        assert_eq!(headers, vec!["May 9, 2026", "Yesterday", "Today"]);
    }

    #[test]
    fn test_day_change_back_starts_new_group() {
        // A refreshed message prepended from a later day splits the list
        let messages = vec![
            message(9, 12, 9, false, false),
            message(1, 10, 9, true, false),
            message(2, 10, 10, false, true),
        ];
        let groups = format(&messages, &utc());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].items.len(), 1);
        assert_eq!(groups[1].items.len(), 2);
    }

    #[test]
    fn test_format_is_deterministic() {
        let messages = vec![message(1, 10, 9, true, false), message(2, 11, 9, false, true)];
        let options = utc().with_today(NaiveDate::from_ymd_opt(2026, 5, 11).unwrap());
        assert_eq!(format(&messages, &options), format(&messages, &options));
    }

    #[test]
    fn test_attachment_items() {
        let message = Message {
            id: MessageId(1),
            content: MessageContent::Attachment {
                attachment: AttachmentDescriptor {
                    display_name: "resume.pdf".to_string(),
                    size_bytes: 48_000,
                    size_label: "46.9 KB".to_string(),
                    mime_kind: MimeKind::File,
                    file_type: Some("PDF".to_string()),
                    source_ref: "content://resume.pdf".to_string(),
                },
            },
            created_at: Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap(),
            originated_locally: true,
            is_read: false,
        };
        let item = &format(&[message], &utc())[0].items[0];
        assert_eq!(item.kind, MessageKind::File);
        assert_eq!(item.body, "[PDF] resume.pdf (46.9 KB)");
        assert_eq!(item.receipt, Some(ReadReceipt::Sent));
    }
}
