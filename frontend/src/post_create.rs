use yew::prelude::*;
use yew_router::prelude::*;
use shared::{validate_post_request, CreatePostRequest, Entity, MAX_AUTHOR_LENGTH, MAX_BODY_LENGTH, MAX_TITLE_LENGTH};
use crate::{api, poll_create::{render_input, render_textarea}, styles::*, Route};

pub enum Msg {
    UpdateField(&'static str, String),
    TokenReceived(Result<String, String>),
    Submit,
    SubmitResult(Result<Entity, String>),
}

impl From<(&'static str, String)> for Msg {
    fn from((field, value): (&'static str, String)) -> Self {
        Msg::UpdateField(field, value)
    }
}

#[derive(Default)]
pub struct PostCreate {
    title: String,
    body: String,
    author: String,
    csrf_token: Option<String>,
    error: Option<String>,
    submitting: bool,
}

impl Component for PostCreate {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        ctx.link().send_future(async { Msg::TokenReceived(api::fetch_csrf_token().await) });
        Self::default()
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::UpdateField("title", value) => self.title = value,
            Msg::UpdateField("body", value) => self.body = value,
            Msg::UpdateField("author", value) => self.author = value,
            Msg::UpdateField(_, _) => return false,
            Msg::TokenReceived(Ok(token)) => self.csrf_token = Some(token),
            Msg::TokenReceived(Err(error)) => self.error = Some(error),
            Msg::Submit => {
                let request = CreatePostRequest {
                    csrf_token: self.csrf_token.clone().unwrap_or_default(),
                    title: self.title.trim().to_string(),
                    body: self.body.trim().to_string(),
                    author: self.author.trim().to_string(),
                };
                if let Err(error) = validate_post_request(&request) {
                    self.error = Some(error.to_string());
                    return true;
                }
                self.submitting = true;
                self.error = None;
                ctx.link().send_future(async move { Msg::SubmitResult(api::create_post(request).await) });
            }
            Msg::SubmitResult(Ok(_)) => {
                if let Some(navigator) = ctx.link().navigator() {
                    navigator.push(&Route::Board);
                }
                return false;
            }
            Msg::SubmitResult(Err(error)) => {
                self.error = Some(error);
                self.submitting = false;
            }
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let onsubmit = ctx.link().callback(|e: SubmitEvent| {
            e.prevent_default();
            Msg::Submit
        });
        let submit_disabled = self.submitting || self.csrf_token.is_none() || self.title.trim().is_empty();

        html! {
            <div class={BG_PAGE}>
                <div class={CARD}>
                    <h1 class={HEADING_LG}>{"Share with the Circle"}</h1>
                    {if let Some(error) = &self.error {
                        html! { <div class={alert_style(Tone::Error)}>{error}</div> }
                    } else { html! {} }}

                    <form {onsubmit} class={SPACE_Y_LG}>
                        {render_input(ctx, "title", "Title", &self.title, MAX_TITLE_LENGTH)}
                        {render_textarea(ctx, "body", "Post", &self.body, MAX_BODY_LENGTH)}
                        {render_input(ctx, "author", "Your name", &self.author, MAX_AUTHOR_LENGTH)}

                        <button type="submit" class={button_primary(true)} disabled={submit_disabled}>
                            {if self.submitting { "Posting..." } else { "Post" }}
                        </button>
                    </form>
                </div>
            </div>
        }
    }
}
