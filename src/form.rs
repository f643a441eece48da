use crate::models::FieldError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";
pub const INVALID_CLASS: &str = "is-invalid";
pub const ENHANCED_SELECT_CLASS: &str = "select2";

static FORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form\s*>").unwrap());
static OPEN_FORM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*)").unwrap());
static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<input\b([^>]*)>|<select\b([^>]*)>(.*?)</select\s*>|<textarea\b([^>]*)>(.*?)</textarea\s*>",
    )
    .unwrap()
});
static BUTTON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<button\b([^>]*)>").unwrap());
static OPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<option\b([^>]*)>([^<]*)").unwrap());
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"([A-Za-z_:@][-A-Za-z0-9_:.@]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .unwrap()
});
static CLASS_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(\s)class\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static FEEDBACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<div class="invalid-feedback">.*?</div>"#).unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn parse(source: &str) -> Self {
        let pairs = ATTR_RE
            .captures_iter(source)
            .map(|caps| {
                let name = caps[1].to_ascii_lowercase();
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| decode_entities(m.as_str()))
                    .unwrap_or_default();
                (name, value)
            })
            .collect();
        Self(pairs)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub values: Vec<String>,
    pub disabled: bool,
    /// Widget id of an enhanced (select2) select.
    pub widget: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDocument {
    pub action: Option<String>,
    pub fields: Vec<Field>,
    pub has_submit_control: bool,
}

impl FormDocument {
    /// Parses the first `<form>` in `html`, if any.
    pub fn first_in(html: &str) -> Option<Self> {
        let (attrs, inner) = match FORM_RE.captures(html) {
            Some(caps) => (Attributes::parse(&caps[1]), caps[2].to_string()),
            None => {
                let caps = OPEN_FORM_RE.captures(html)?;
                (Attributes::parse(&caps[1]), caps[2].to_string())
            }
        };

        let action = attrs
            .get("action")
            .map(str::trim)
            .filter(|action| !action.is_empty())
            .map(str::to_string);

        let mut fields = Vec::new();
        let mut has_submit_control = false;

        for caps in FIELD_RE.captures_iter(&inner) {
            if let Some(raw) = caps.get(1) {
                let attrs = Attributes::parse(raw.as_str());
                let input_type = attrs
                    .get("type")
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_else(|| "text".to_string());
                if input_type == "submit" || input_type == "image" {
                    has_submit_control = true;
                }
                if let Some(field) = input_field(&attrs, &input_type) {
                    fields.push(field);
                }
            } else if let Some(raw) = caps.get(2) {
                let attrs = Attributes::parse(raw.as_str());
                let body = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
                if let Some(field) = select_field(&attrs, body) {
                    fields.push(field);
                }
            } else if let Some(raw) = caps.get(4) {
                let attrs = Attributes::parse(raw.as_str());
                let body = caps.get(5).map(|m| m.as_str()).unwrap_or_default();
                if let Some(name) = attrs.get("name").filter(|name| !name.is_empty()) {
                    let text = decode_entities(body);
                    let text = text.strip_prefix('\n').unwrap_or(&text).to_string();
                    fields.push(Field {
                        name: name.to_string(),
                        values: vec![text],
                        disabled: attrs.has("disabled"),
                        widget: None,
                    });
                }
            }
        }

        has_submit_control |= BUTTON_RE.captures_iter(&inner).any(|caps| {
            let attrs = Attributes::parse(&caps[1]);
            match attrs.get("type") {
                Some(kind) => kind.eq_ignore_ascii_case("submit"),
                None => true,
            }
        });

        Some(Self {
            action,
            fields,
            has_submit_control,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Overrides the submitted value of `name`; unknown names are appended.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        let mut value = Some(value.into());
        for field in self.fields.iter_mut().filter(|field| field.name == name) {
            field.values = value.take().into_iter().collect();
        }
        if let Some(value) = value {
            self.fields.push(Field {
                name: name.to_string(),
                values: vec![value],
                disabled: false,
                widget: None,
            });
        }
    }

    /// Name/value pairs in document order, the way a browser builds form data.
    pub fn form_data(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter(|field| !field.disabled)
            .flat_map(|field| {
                field
                    .values
                    .iter()
                    .map(move |value| (field.name.clone(), value.clone()))
            })
            .collect()
    }

    /// Ids of the enhanced select widgets, in document order.
    pub fn enhanced_widgets(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter_map(|field| field.widget.clone())
            .collect()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.field(CSRF_FIELD)
            .and_then(|field| field.values.first())
            .map(String::as_str)
            .filter(|token| !token.is_empty())
    }
}

fn input_field(attrs: &Attributes, input_type: &str) -> Option<Field> {
    if matches!(
        input_type,
        "submit" | "button" | "reset" | "image" | "file"
    ) {
        return None;
    }
    let name = attrs.get("name").filter(|name| !name.is_empty())?;
    let value = attrs.get("value").unwrap_or_default();
    let values = match input_type {
        "checkbox" | "radio" => {
            if attrs.has("checked") {
                vec![if attrs.has("value") {
                    value.to_string()
                } else {
                    "on".to_string()
                }]
            } else {
                Vec::new()
            }
        }
        _ => vec![value.to_string()],
    };
    Some(Field {
        name: name.to_string(),
        values,
        disabled: attrs.has("disabled"),
        widget: None,
    })
}

fn select_field(attrs: &Attributes, body: &str) -> Option<Field> {
    let name = attrs.get("name").filter(|name| !name.is_empty())?;
    let multiple = attrs.has("multiple");

    let options: Vec<(String, bool)> = OPTION_RE
        .captures_iter(body)
        .map(|caps| {
            let option_attrs = Attributes::parse(&caps[1]);
            let value = match option_attrs.get("value") {
                Some(value) => value.to_string(),
                None => decode_entities(caps[2].trim()),
            };
            (value, option_attrs.has("selected"))
        })
        .collect();

    let mut values: Vec<String> = options
        .iter()
        .filter(|(_, selected)| *selected)
        .map(|(value, _)| value.clone())
        .collect();
    if !multiple {
        values.truncate(1);
        if values.is_empty() {
            values.extend(options.first().map(|(value, _)| value.clone()));
        }
    }

    let widget = attrs
        .has_class(ENHANCED_SELECT_CLASS)
        .then(|| attrs.get("id").unwrap_or(name).to_string());
    Some(Field {
        name: name.to_string(),
        values,
        disabled: attrs.has("disabled"),
        widget,
    })
}

/// Reads the anti-forgery token from a hidden input anywhere in `html`.
pub fn csrf_token(html: &str) -> Option<String> {
    FIELD_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| Attributes::parse(m.as_str())))
        .find(|attrs| attrs.get("name") == Some(CSRF_FIELD))
        .and_then(|attrs| attrs.get("value").map(str::to_string))
        .filter(|token| !token.is_empty())
}

/// Marks each errored field invalid and places one feedback message after it.
///
/// Feedback left by an earlier pass is removed first. Returns the new markup
/// and the names of the fields that were found.
pub fn annotate(html: &str, errors: &[FieldError]) -> (String, Vec<String>) {
    let mut markup = clear_annotations(html);
    let mut marked = Vec::new();

    for error in errors {
        let pattern = format!(
            r#"(?is)<(input|select|textarea)\b[^>]*\sname\s*=\s*["']{}["'][^>]*>"#,
            regex::escape(&error.field)
        );
        let Ok(field_re) = Regex::new(&pattern) else {
            continue;
        };
        let Some(found) = field_re.captures(&markup) else {
            continue;
        };
        let whole = found.get(0).map(|m| (m.start(), m.end(), m.as_str().to_string()));
        let Some((start, open_end, open_tag)) = whole else {
            continue;
        };
        let tag_name = found[1].to_ascii_lowercase();

        let insert_at = if tag_name == "input" {
            open_end
        } else {
            let closing = format!("</{tag_name}");
            let lower_rest = markup[open_end..].to_ascii_lowercase();
            match lower_rest.find(&closing) {
                Some(offset) => {
                    let close_start = open_end + offset;
                    markup[close_start..]
                        .find('>')
                        .map(|end| close_start + end + 1)
                        .unwrap_or(markup.len())
                }
                None => open_end,
            }
        };

        let feedback = format!(
            r#"<div class="invalid-feedback">{}</div>"#,
            escape_html(&error.message)
        );
        let marked_tag = add_invalid_class(&open_tag, &tag_name);

        let mut next = String::with_capacity(markup.len() + feedback.len() + 16);
        next.push_str(&markup[..start]);
        next.push_str(&marked_tag);
        next.push_str(&markup[open_end..insert_at]);
        next.push_str(&feedback);
        next.push_str(&markup[insert_at..]);
        markup = next;
        marked.push(error.field.clone());
    }

    (markup, marked)
}

pub fn clear_annotations(html: &str) -> String {
    let without_feedback = FEEDBACK_RE.replace_all(html, "");
    CLASS_ATTR_RE
        .replace_all(&without_feedback, |caps: &Captures| {
            let (classes, quote) = class_list(caps);
            let classes: Vec<&str> = classes
                .split_whitespace()
                .filter(|class| *class != INVALID_CLASS)
                .collect();
            format!("{}class={quote}{}{quote}", &caps[1], classes.join(" "))
        })
        .into_owned()
}

fn add_invalid_class(open_tag: &str, tag_name: &str) -> String {
    if let Some(caps) = CLASS_ATTR_RE.captures(open_tag) {
        let Some(whole) = caps.get(0) else {
            return open_tag.to_string();
        };
        let (classes, quote) = class_list(&caps);
        let classes = classes.trim();
        let joined = if classes.is_empty() {
            INVALID_CLASS.to_string()
        } else {
            format!("{classes} {INVALID_CLASS}")
        };
        format!(
            "{}{}class={quote}{joined}{quote}{}",
            &open_tag[..whole.start()],
            &caps[1],
            &open_tag[whole.end()..]
        )
    } else {
        let split = 1 + tag_name.len();
        format!(
            r#"{} class="{}"{}"#,
            &open_tag[..split],
            INVALID_CLASS,
            &open_tag[split..]
        )
    }
}

fn class_list<'h>(caps: &Captures<'h>) -> (&'h str, char) {
    match caps.get(2) {
        Some(value) => (value.as_str(), '"'),
        None => (caps.get(3).map_or("", |value| value.as_str()), '\''),
    }
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
