use web_sys::{HtmlInputElement, HtmlTextAreaElement};
use yew::prelude::*;
use yew_router::prelude::*;
use shared::{
    validate_poll_request, CreatePollRequest, Entity, MAX_AUTHOR_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH,
    MIN_OPTIONS,
};
use crate::{api, option_manager::OptionManager, styles::*, Route};

#[derive(Clone, Default)]
pub struct FormState {
    title: String,
    description: String,
    author: String,
    options: Vec<String>,
    csrf_token: Option<String>,
    error: Option<String>,
    submitting: bool,
}

pub enum Msg {
    UpdateField(&'static str, String),
    UpdateOptions(Vec<String>),
    TokenReceived(Result<String, String>),
    Submit,
    SubmitResult(Result<Entity, String>),
}

pub struct PollCreate {
    state: FormState,
}

impl Component for PollCreate {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        ctx.link().send_future(async { Msg::TokenReceived(api::fetch_csrf_token().await) });
        Self { state: FormState::default() }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::UpdateField(field, value) => {
                match field {
                    "title" => self.state.title = value,
                    "description" => self.state.description = value,
                    "author" => self.state.author = value,
                    _ => return false,
                }
                true
            }
            Msg::UpdateOptions(options) => {
                self.state.options = options;
                true
            }
            Msg::TokenReceived(Ok(token)) => {
                self.state.csrf_token = Some(token);
                true
            }
            Msg::TokenReceived(Err(error)) => {
                self.state.error = Some(error);
                true
            }
            Msg::Submit => {
                let request = self.create_request();
                if let Err(error) = validate_poll_request(&request) {
                    self.state.error = Some(error.to_string());
                    return true;
                }

                self.state.submitting = true;
                self.state.error = None;
                ctx.link().send_future(async move { Msg::SubmitResult(api::create_poll(request).await) });
                true
            }
            Msg::SubmitResult(Ok(_)) => {
                if let Some(navigator) = ctx.link().navigator() {
                    navigator.push(&Route::Polls);
                }
                false
            }
            Msg::SubmitResult(Err(error)) => {
                self.state.error = Some(error);
                self.state.submitting = false;
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let onsubmit = ctx.link().callback(|e: SubmitEvent| {
            e.prevent_default();
            Msg::Submit
        });
        let submit_disabled = self.state.submitting
            || self.state.csrf_token.is_none()
            || self.state.options.len() < MIN_OPTIONS
            || self.state.title.trim().is_empty();

        html! {
            <div class={BG_PAGE}>
                <div class={CARD}>
                    <h1 class={HEADING_LG}>{"Ask the Dads"}</h1>
                    {if let Some(error) = &self.state.error {
                        html! { <div class={alert_style(Tone::Error)}>{error}</div> }
                    } else { html! {} }}

                    <form {onsubmit} class={SPACE_Y_LG}>
                        {render_input(ctx, "title", "Question", &self.state.title, MAX_TITLE_LENGTH)}
                        {render_textarea(ctx, "description", "Details", &self.state.description, MAX_DESCRIPTION_LENGTH)}
                        {render_input(ctx, "author", "Your name", &self.state.author, MAX_AUTHOR_LENGTH)}

                        <div class={SPACE_Y_BASE}>
                            <label class={TEXT_LABEL}>{"Answers"}</label>
                            <OptionManager
                                options={self.state.options.clone()}
                                on_change={ctx.link().callback(Msg::UpdateOptions)}
                            />
                        </div>

                        <button type="submit" class={button_primary(true)} disabled={submit_disabled}>
                            {if self.state.submitting { "Creating..." } else { "Create Poll" }}
                        </button>
                    </form>
                </div>
            </div>
        }
    }
}

impl PollCreate {
    fn create_request(&self) -> CreatePollRequest {
        CreatePollRequest {
            csrf_token: self.state.csrf_token.clone().unwrap_or_default(),
            title: self.state.title.trim().to_string(),
            description: self.state.description.trim().to_string(),
            options: self.state.options.clone(),
            author: self.state.author.trim().to_string(),
        }
    }
}

/// Labelled single-line input with a character counter.
pub fn render_input<C>(ctx: &Context<C>, field: &'static str, label: &str, value: &str, max_length: usize) -> Html
where
    C: Component,
    C::Message: From<(&'static str, String)>,
{
    let oninput = ctx.link().callback(move |e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        C::Message::from((field, input.value()))
    });

    html! {
        <div class={SPACE_Y_BASE}>
            <label class={TEXT_LABEL}>
                {format!("{} ({}/{})", label, value.chars().count(), max_length)}
            </label>
            <input type="text" class={INPUT_BASE} value={value.to_string()}
                maxlength={max_length.to_string()} {oninput}
                placeholder={format!("Enter {}", label.to_lowercase())} />
        </div>
    }
}

pub fn render_textarea<C>(ctx: &Context<C>, field: &'static str, label: &str, value: &str, max_length: usize) -> Html
where
    C: Component,
    C::Message: From<(&'static str, String)>,
{
    let oninput = ctx.link().callback(move |e: InputEvent| {
        let area: HtmlTextAreaElement = e.target_unchecked_into();
        C::Message::from((field, area.value()))
    });

    html! {
        <div class={SPACE_Y_BASE}>
            <label class={TEXT_LABEL}>
                {format!("{} ({}/{})", label, value.chars().count(), max_length)}
            </label>
            <textarea class={INPUT_BASE} rows="5" value={value.to_string()}
                maxlength={max_length.to_string()} {oninput}
                placeholder={format!("Enter {}", label.to_lowercase())} />
        </div>
    }
}

impl From<(&'static str, String)> for Msg {
    fn from((field, value): (&'static str, String)) -> Self {
        Msg::UpdateField(field, value)
    }
}
