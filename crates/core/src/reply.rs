use serde::Serialize;

use crate::directory::BusinessResult;

pub const GENERIC_GREETING: &str = "Hello there!";
pub const WEBHOOK_ACKNOWLEDGEMENT: &str = "Coming Along Now";
pub const SEARCH_NOTICE: &str =
    "Give me a couple seconds to search through and rank all the surrounding restaurants!!";

const ATTACHMENT_FALLBACK: &str = "Food Food Food!";
const ATTACHMENT_COLOR: &str = "#ff0000";

/// Legacy message attachment: a title linking to the business, its url as
/// body text and a thumbnail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    pub text: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyPayload {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), attachments: Vec::new() }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

pub fn greeting(display_name: Option<&str>) -> ReplyPayload {
    match display_name {
        Some(name) => ReplyPayload::text(format!("Hello, {name}!")),
        None => ReplyPayload::text(GENERIC_GREETING),
    }
}

pub fn help(display_name: Option<&str>) -> ReplyPayload {
    match display_name {
        Some(name) => ReplyPayload::text(format!(
            "I got you, {name}! You can ask me to help you find the best food near you!"
        )),
        None => ReplyPayload::text(GENERIC_GREETING),
    }
}

pub fn location_prompt(display_name: Option<&str>) -> ReplyPayload {
    let opener = match display_name {
        Some(name) => format!("Sure, I got you, {name}."),
        None => "Sure, I got you.".to_owned(),
    };
    ReplyPayload::text(format!(
        "{opener} Can you tell me where are you currently located? (Example: Hanover, NH)"
    ))
}

pub fn food_choice_prompt(display_name: Option<&str>) -> ReplyPayload {
    match display_name {
        Some(name) => ReplyPayload::text(format!("Now, {name}, what are you craving? (Example: Sushi)")),
        None => ReplyPayload::text("Now, what are you craving? (Example: Sushi)"),
    }
}

pub fn search_notice() -> ReplyPayload {
    ReplyPayload::text(SEARCH_NOTICE)
}

pub fn no_results(food_choice: &str, location: &str) -> ReplyPayload {
    ReplyPayload::text(format!(
        "Sorry, I couldn't find any place for {food_choice} near {location}. Try another craving or location!"
    ))
}

pub fn search_apology() -> ReplyPayload {
    ReplyPayload::text(
        "Sorry, I couldn't reach the restaurant directory right now. Please ask me again in a little while!",
    )
}

pub fn webhook_acknowledgement() -> ReplyPayload {
    ReplyPayload::text(WEBHOOK_ACKNOWLEDGEMENT)
}

/// Builds the three-part answer for the top search hit: a summary line, a
/// detail line and an attachment preview. A missing result yields the
/// not-found reply instead.
pub fn format_result(
    result: Option<&BusinessResult>,
    food_choice: &str,
    location: &str,
) -> Vec<ReplyPayload> {
    let Some(result) = result else {
        return vec![no_results(food_choice, location)];
    };

    let summary =
        ReplyPayload::text(format!("We have found the best place for {food_choice}: {}", result.name));
    let detail = ReplyPayload::text(format!(
        "It has {} reviews on Yelp, with an average rating of {}. Call {} if you wanna order food now!",
        result.review_count, result.rating, result.phone
    ));
    let preview = ReplyPayload::text(String::new()).with_attachment(Attachment {
        fallback: ATTACHMENT_FALLBACK.to_owned(),
        title: result.name.clone(),
        title_link: non_empty(&result.url),
        text: result.url.clone(),
        color: ATTACHMENT_COLOR.to_owned(),
        thumb_url: non_empty(&result.image_url),
    });

    vec![summary, detail, preview]
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_owned())
}
