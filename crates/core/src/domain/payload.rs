use crate::error::{CoreError, Result};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

/// Key of the only field that is ever rewritten
pub const CREATE_TIME_KEY: &str = "createTime";

/// Payload characters shown in a template preview
pub const PREVIEW_CHARS: usize = 50;

// A field starts at the beginning of the payload, after the kind tag (`|`)
// or after another field (`&`). Group 2 is the value.
static CREATE_TIME_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[|&])createTime=([^&]*)").expect("createTime field pattern is valid")
});

/// Caller-supplied identifiers. A missing or blank value is generated at random.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identifiers {
    pub id: Option<String>,
    pub site_id: Option<String>,
    pub class_lesson_id: Option<String>,
}

impl Identifiers {
    pub fn id(&self) -> Option<&str> {
        supplied(&self.id)
    }

    pub fn site_id(&self) -> Option<&str> {
        supplied(&self.site_id)
    }

    pub fn class_lesson_id(&self) -> Option<&str> {
        supplied(&self.class_lesson_id)
    }

    /// True when every identifier will be generated
    pub fn is_random(&self) -> bool {
        self.id().is_none() && self.site_id().is_none() && self.class_lesson_id().is_none()
    }
}

fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Shape of a freshly generated payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadLayout {
    /// Literal tag in front of the fields
    pub kind: String,
    /// Digits in generated `id` and `siteId` values
    pub id_length: usize,
    /// Digits in a generated `classLessonId` value
    pub class_lesson_id_length: usize,
}

impl Default for PayloadLayout {
    fn default() -> Self {
        Self {
            kind: "checkwork".to_string(),
            id_length: 19,
            class_lesson_id_length: 19,
        }
    }
}

impl PayloadLayout {
    pub fn render(&self, id: &str, site_id: &str, create_time: &str, class_lesson_id: &str) -> String {
        format!(
            "{}|id={}&siteId={}&{}={}&classLessonId={}",
            self.kind, id, site_id, CREATE_TIME_KEY, create_time, class_lesson_id
        )
    }
}

/// How a timestamp was written in its source payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeFormat {
    fraction_digits: Option<usize>,
}

impl TimeFormat {
    /// `YYYY-MM-DDTHH:MM:SS.mmm`, used for generated payloads
    pub const CANONICAL: Self = Self { fraction_digits: Some(3) };

    /// `YYYY-MM-DDTHH:MM:SS`
    pub const WHOLE_SECONDS: Self = Self { fraction_digits: None };

    pub fn with_fraction(digits: usize) -> Self {
        if digits == 0 {
            Self::WHOLE_SECONDS
        } else {
            Self { fraction_digits: Some(digits) }
        }
    }

    /// Derive the format from a timestamp text with any zone suffix removed
    pub fn observe(text: &str) -> Self {
        match text.split_once('.') {
            Some((_, fraction)) => {
                Self::with_fraction(fraction.chars().take_while(char::is_ascii_digit).count())
            }
            None => Self::WHOLE_SECONDS,
        }
    }

    pub fn has_fraction(&self) -> bool {
        self.fraction_digits.is_some()
    }

    pub fn fraction_width(&self) -> Option<usize> {
        self.fraction_digits
    }

    /// Render `time` with exactly the observed fraction width, truncating.
    /// No zone suffix is ever written.
    pub fn render(&self, time: NaiveDateTime) -> String {
        let whole = time.format("%Y-%m-%dT%H:%M:%S").to_string();
        let Some(width) = self.fraction_digits else {
            return whole;
        };

        // Leap seconds report nanoseconds past 999_999_999
        let nanos = time.nanosecond().min(999_999_999);
        let mut digits = format!("{nanos:09}");
        if width <= digits.len() {
            digits.truncate(width);
        } else {
            digits.extend(std::iter::repeat_n('0', width - digits.len()));
        }
        format!("{whole}.{digits}")
    }
}

impl std::fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fraction_digits {
            Some(width) => write!(f, "seconds + {width} fractional digits"),
            None => write!(f, "whole seconds"),
        }
    }
}

/// Where a template came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOrigin {
    Generated,
    Imported,
}

impl std::fmt::Display for TemplateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateOrigin::Generated => write!(f, "generated"),
            TemplateOrigin::Imported => write!(f, "imported"),
        }
    }
}

/// Payload text plus the epoch and time format every slot payload is derived from.
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    payload: String,
    epoch: NaiveDateTime,
    time_format: TimeFormat,
    origin: TemplateOrigin,
}

impl Template {
    /// Build a new payload at `now` with fresh random identifiers where none are supplied
    pub fn generate(ids: &Identifiers, now: NaiveDateTime, layout: &PayloadLayout) -> Self {
        create(ids, now, layout, &mut rand::rng())
    }

    /// Adopt a captured payload, taking its `createTime` as the epoch
    pub fn import(raw: impl Into<String>) -> Result<Self> {
        let payload = raw.into();
        let (time_format, epoch) = parse(&payload)?;
        Ok(Self {
            payload,
            epoch,
            time_format,
            origin: TemplateOrigin::Imported,
        })
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn epoch(&self) -> NaiveDateTime {
        self.epoch
    }

    pub fn time_format(&self) -> TimeFormat {
        self.time_format
    }

    pub fn origin(&self) -> TemplateOrigin {
        self.origin
    }

    /// The payload claiming to have been created at `slot_time`
    pub fn payload_at(&self, slot_time: NaiveDateTime) -> String {
        with_timestamp(&self.payload, slot_time, self.time_format)
    }

    pub fn preview(&self) -> String {
        let mut chars = self.payload.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            origin: self.origin,
            epoch: self.epoch,
            time_format: self.time_format,
            preview: self.preview(),
        }
    }
}

/// What the display layer needs to know about the loaded template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSummary {
    pub origin: TemplateOrigin,
    pub epoch: NaiveDateTime,
    pub time_format: TimeFormat,
    pub preview: String,
}

/// Build a payload from the layout, using supplied identifiers verbatim and
/// `rng` digits for the rest. The epoch is `now`; the payload shows it with
/// millisecond precision.
pub fn create(ids: &Identifiers, now: NaiveDateTime, layout: &PayloadLayout, rng: &mut impl Rng) -> Template {
    let id = ids
        .id()
        .map(str::to_owned)
        .unwrap_or_else(|| random_digits(rng, layout.id_length));
    let site_id = ids
        .site_id()
        .map(str::to_owned)
        .unwrap_or_else(|| random_digits(rng, layout.id_length));
    let class_lesson_id = ids
        .class_lesson_id()
        .map(str::to_owned)
        .unwrap_or_else(|| random_digits(rng, layout.class_lesson_id_length));

    let time_format = TimeFormat::CANONICAL;
    let payload = layout.render(&id, &site_id, &time_format.render(now), &class_lesson_id);

    Template {
        payload,
        epoch: now,
        time_format,
        origin: TemplateOrigin::Generated,
    }
}

/// Find `createTime` in a raw payload and read it as a zone-less local time.
/// A zone suffix is accepted and dropped: the wall-clock digits are kept as written.
pub fn parse(raw: &str) -> Result<(TimeFormat, NaiveDateTime)> {
    let value = create_time_range(raw)
        .map(|range| &raw[range])
        .filter(|value| !value.is_empty())
        .ok_or(CoreError::NoTimestampField)?;

    let unparsable = || CoreError::UnparsableTimestamp { value: value.to_string() };

    let (local, zone) = split_zone(value);
    if zone.is_some_and(|zone| !is_zone_suffix(zone)) {
        return Err(unparsable());
    }
    let time = parse_local(local).ok_or_else(unparsable)?;

    Ok((TimeFormat::observe(local), time))
}

/// Replace the `createTime` value with `target` rendered in `format`.
/// Every other byte of the payload is kept as is.
pub fn with_timestamp(raw: &str, target: NaiveDateTime, format: TimeFormat) -> String {
    let Some(range) = create_time_range(raw) else {
        return raw.to_string();
    };

    let rendered = format.render(target);
    let mut out = String::with_capacity(raw.len() - range.len() + rendered.len());
    out.push_str(&raw[..range.start]);
    out.push_str(&rendered);
    out.push_str(&raw[range.end..]);
    out
}

fn create_time_range(raw: &str) -> Option<Range<usize>> {
    CREATE_TIME_FIELD
        .captures(raw)
        .and_then(|captures| captures.get(2))
        .map(|value| value.range())
}

fn random_digits(rng: &mut impl Rng, length: usize) -> String {
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Split `2025-03-13T16:34:01.221+08:00` into the local part and the zone suffix
fn split_zone(value: &str) -> (&str, Option<&str>) {
    let time_start = value
        .find(['T', 't', ' '])
        .map(|index| index + 1)
        .unwrap_or(value.len());

    match value[time_start..].find(['Z', 'z', '+', '-']) {
        Some(offset) => {
            let split = time_start + offset;
            (&value[..split], Some(&value[split..]))
        }
        None => (value, None),
    }
}

/// `Z`, `±HH`, `±HHMM` or `±HH:MM`
fn is_zone_suffix(zone: &str) -> bool {
    if zone.eq_ignore_ascii_case("z") {
        return true;
    }
    let Some(digits) = zone.strip_prefix(['+', '-']) else {
        return false;
    };
    let digits = match digits.split_once(':') {
        Some((hours, minutes)) if hours.len() == 2 && minutes.len() == 2 => format!("{hours}{minutes}"),
        Some(_) => return false,
        None => digits.to_string(),
    };
    matches!(digits.len(), 2 | 4) && digits.chars().all(|c| c.is_ascii_digit())
}

fn parse_local(text: &str) -> Option<NaiveDateTime> {
    const DATE_TIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn at(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").unwrap()
    }

    fn fixed_ids() -> Identifiers {
        Identifiers {
            id: Some("1234567890123456789".to_string()),
            site_id: Some("9876543210987654321".to_string()),
            class_lesson_id: Some("1111111111111111111".to_string()),
        }
    }

    const CAPTURED: &str = "checkwork|id=1908654321098765432&siteId=1800000000000000001&createTime=2025-03-13T16:34:01.221&classLessonId=1899999999999999999";

    #[test]
    fn test_create_uses_supplied_identifiers_verbatim() {
        let mut rng = StdRng::seed_from_u64(7);
        let template = create(&fixed_ids(), at("2025-03-13T16:34:01.221"), &PayloadLayout::default(), &mut rng);

        assert_eq!(
            template.payload(),
            "checkwork|id=1234567890123456789&siteId=9876543210987654321&createTime=2025-03-13T16:34:01.221&classLessonId=1111111111111111111"
        );
        assert_eq!(template.time_format(), TimeFormat::CANONICAL);
        assert_eq!(template.origin(), TemplateOrigin::Generated);
    }

    #[test]
    fn test_create_generates_missing_identifiers() {
        let mut rng = StdRng::seed_from_u64(42);
        let ids = Identifiers {
            id: None,
            site_id: Some("   ".to_string()),
            class_lesson_id: Some(String::new()),
        };
        assert!(ids.is_random());

        let template = create(&ids, at("2025-03-13T16:34:01"), &PayloadLayout::default(), &mut rng);
        let fields: Vec<&str> = template
            .payload()
            .trim_start_matches("checkwork|")
            .split('&')
            .collect();

        for (field, key) in fields.iter().zip(["id", "siteId", "createTime", "classLessonId"]) {
            let (name, value) = field.split_once('=').unwrap();
            assert_eq!(name, key);
            if key != "createTime" {
                assert_eq!(value.len(), 19, "{key} should be 19 digits");
                assert!(value.chars().all(|c| c.is_ascii_digit()));
            }
        }
    }

    #[test]
    fn test_create_respects_layout_lengths_and_kind() {
        let mut rng = StdRng::seed_from_u64(1);
        let layout = PayloadLayout {
            kind: "signin".to_string(),
            id_length: 4,
            class_lesson_id_length: 6,
        };
        let template = create(&Identifiers::default(), at("2025-01-01T08:00:00"), &layout, &mut rng);

        assert!(template.payload().starts_with("signin|id="));
        let lesson = template.payload().rsplit("classLessonId=").next().unwrap();
        assert_eq!(lesson.len(), 6);
    }

    #[test]
    fn test_create_then_parse_recovers_epoch_to_the_millisecond() {
        let now = at("2025-03-13T16:34:01.221987");
        let template = Template::generate(&fixed_ids(), now, &PayloadLayout::default());

        let (format, epoch) = parse(template.payload()).unwrap();
        assert_eq!(format, TimeFormat::CANONICAL);
        assert_eq!(epoch, at("2025-03-13T16:34:01.221"));
        assert_eq!(template.epoch(), now);
    }

    #[test]
    fn test_parse_observes_fraction_width() {
        let (format, epoch) = parse(CAPTURED).unwrap();
        assert_eq!(format.fraction_width(), Some(3));
        assert_eq!(epoch, at("2025-03-13T16:34:01.221"));

        let (format, _) = parse("checkwork|createTime=2025-03-13T16:34:01&id=1").unwrap();
        assert!(!format.has_fraction());

        let (format, epoch) = parse("x|createTime=2025-03-13T16:34:01.221456").unwrap();
        assert_eq!(format.fraction_width(), Some(6));
        assert_eq!(epoch, at("2025-03-13T16:34:01.221456"));
    }

    #[test]
    fn test_parse_discards_timezone_suffix() {
        for value in [
            "2025-03-13T16:34:01.221+08:00",
            "2025-03-13T16:34:01.221Z",
            "2025-03-13T16:34:01.221-0500",
            "2025-03-13T16:34:01.221+08",
        ] {
            let raw = format!("checkwork|id=1&createTime={value}&classLessonId=2");
            let (format, epoch) = parse(&raw).unwrap();
            assert_eq!(epoch, at("2025-03-13T16:34:01.221"), "{value}");
            assert_eq!(format.fraction_width(), Some(3), "{value}");
        }
    }

    #[test]
    fn test_parse_without_field_fails() {
        let err = parse("checkwork|id=1&siteId=2&classLessonId=3").unwrap_err();
        assert!(matches!(err, CoreError::NoTimestampField));

        let err = parse("checkwork|id=1&createTime=&classLessonId=3").unwrap_err();
        assert!(matches!(err, CoreError::NoTimestampField));
    }

    #[test]
    fn test_parse_garbage_timestamp_fails() {
        let err = parse("checkwork|createTime=yesterday&id=1").unwrap_err();
        match err {
            CoreError::UnparsableTimestamp { value } => assert_eq!(value, "yesterday"),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(parse("checkwork|createTime=2025-13-40T99:00:00").is_err());
        assert!(parse("checkwork|createTime=2025-03-13T16:34:01+bogus").is_err());
    }

    #[test]
    fn test_parse_matches_whole_field_names_only() {
        let raw = "checkwork|lastcreateTime=1999-01-01T00:00:00&createTime=2025-03-13T16:34:01.221";
        let (_, epoch) = parse(raw).unwrap();
        assert_eq!(epoch, at("2025-03-13T16:34:01.221"));

        let rewritten = with_timestamp(raw, at("2025-03-13T16:35:00"), TimeFormat::CANONICAL);
        assert_eq!(
            rewritten,
            "checkwork|lastcreateTime=1999-01-01T00:00:00&createTime=2025-03-13T16:35:00.000"
        );
    }

    #[test]
    fn test_with_timestamp_keeps_three_fraction_digits() {
        let (format, _) = parse(CAPTURED).unwrap();
        let rewritten = with_timestamp(CAPTURED, at("2025-03-13T16:35:00"), format);
        assert!(rewritten.contains("&createTime=2025-03-13T16:35:00.000&"));
    }

    #[test]
    fn test_with_timestamp_keeps_whole_seconds() {
        let raw = "checkwork|id=1&siteId=2&createTime=2025-03-13T16:34:01&classLessonId=3";
        let (format, _) = parse(raw).unwrap();
        let rewritten = with_timestamp(raw, at("2025-03-13T16:35:05.999"), format);
        assert_eq!(rewritten, "checkwork|id=1&siteId=2&createTime=2025-03-13T16:35:05&classLessonId=3");
    }

    #[test]
    fn test_with_timestamp_never_writes_a_zone() {
        let raw = "checkwork|id=1&createTime=2025-03-13T16:34:01.221+08:00&classLessonId=3";
        let (format, epoch) = parse(raw).unwrap();
        let rewritten = with_timestamp(raw, epoch, format);
        assert_eq!(rewritten, "checkwork|id=1&createTime=2025-03-13T16:34:01.221&classLessonId=3");
    }

    #[test]
    fn test_with_timestamp_reproduces_other_widths() {
        let target = at("2025-03-13T16:35:00.123456789");
        assert_eq!(TimeFormat::with_fraction(1).render(target), "2025-03-13T16:35:00.1");
        assert_eq!(TimeFormat::with_fraction(6).render(target), "2025-03-13T16:35:00.123456");
        assert_eq!(TimeFormat::with_fraction(9).render(target), "2025-03-13T16:35:00.123456789");
        assert_eq!(TimeFormat::with_fraction(11).render(target), "2025-03-13T16:35:00.12345678900");
        assert_eq!(TimeFormat::with_fraction(0), TimeFormat::WHOLE_SECONDS);
    }

    #[test]
    fn test_with_timestamp_leaves_other_fields_untouched() {
        let (format, _) = parse(CAPTURED).unwrap();
        let rewritten = with_timestamp(CAPTURED, at("2030-12-31T23:59:55"), format);

        let fields = |payload: &str| -> Vec<String> {
            payload
                .split(['|', '&'])
                .filter(|field| !field.starts_with("createTime="))
                .map(str::to_owned)
                .collect()
        };
        assert_eq!(fields(CAPTURED), fields(&rewritten));
    }

    #[test]
    fn test_with_timestamp_twice_equals_once() {
        let (format, _) = parse(CAPTURED).unwrap();
        let t1 = at("2025-03-13T16:40:00.5");
        let t2 = at("2025-03-13T16:45:10.25");

        let twice = with_timestamp(&with_timestamp(CAPTURED, t1, format), t2, format);
        let once = with_timestamp(CAPTURED, t2, format);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_with_timestamp_without_field_is_identity() {
        let raw = "checkwork|id=1&siteId=2";
        assert_eq!(with_timestamp(raw, at("2025-03-13T16:35:00"), TimeFormat::CANONICAL), raw);
    }

    #[test]
    fn test_import_keeps_payload_and_epoch() {
        let template = Template::import(CAPTURED).unwrap();
        assert_eq!(template.payload(), CAPTURED);
        assert_eq!(template.origin(), TemplateOrigin::Imported);
        assert_eq!(template.payload_at(template.epoch()), CAPTURED);
    }

    #[test]
    fn test_preview_truncates_long_payloads() {
        let template = Template::import(CAPTURED).unwrap();
        let summary = template.summary();
        assert!(summary.preview.ends_with("..."));
        assert_eq!(summary.preview.chars().count(), PREVIEW_CHARS + 3);

        let short = Template::import("s|createTime=2025-03-13T16:34:01").unwrap();
        assert_eq!(short.preview(), "s|createTime=2025-03-13T16:34:01");
    }
}
