use yew::prelude::*;
use web_sys::HtmlInputElement;
use shared::{MAX_OPTIONS, MAX_OPTION_LENGTH};
use crate::styles::*;

#[derive(Properties, PartialEq)]
pub struct OptionManagerProps {
    pub options: Vec<String>,
    pub on_change: Callback<Vec<String>>,
}

pub enum Msg {
    UpdateInput(String),
    Add,
    Remove(usize),
    MoveUp(usize),
}

/// Editable list of poll answers.
pub struct OptionManager {
    options: Vec<String>,
    input: String,
    error: Option<String>,
}

impl OptionManager {
    fn is_duplicate(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        self.options.iter().any(|opt| opt.to_lowercase() == value)
    }

    fn emit(&self, ctx: &Context<Self>) {
        ctx.props().on_change.emit(self.options.clone());
    }
}

impl Component for OptionManager {
    type Message = Msg;
    type Properties = OptionManagerProps;

    fn create(ctx: &Context<Self>) -> Self {
        Self {
            options: ctx.props().options.clone(),
            input: String::new(),
            error: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::UpdateInput(value) => {
                self.input = value;
                self.error = None;
            }
            Msg::Add => {
                let value = self.input.trim().to_string();
                if value.is_empty() {
                    return false;
                }
                if self.options.len() >= MAX_OPTIONS {
                    self.error = Some(format!("Maximum number of options ({MAX_OPTIONS}) reached"));
                } else if value.chars().count() > MAX_OPTION_LENGTH {
                    self.error = Some("Option text exceeds maximum length".into());
                } else if self.is_duplicate(&value) {
                    self.error = Some("Duplicate option".into());
                } else {
                    self.options.push(value);
                    self.input.clear();
                    self.emit(ctx);
                }
            }
            Msg::Remove(index) => {
                if index < self.options.len() {
                    self.options.remove(index);
                    self.emit(ctx);
                }
            }
            Msg::MoveUp(index) => {
                if index > 0 && index < self.options.len() {
                    self.options.swap(index - 1, index);
                    self.emit(ctx);
                }
            }
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let full = self.options.len() >= MAX_OPTIONS;

        html! {
            <div class={SPACE_Y_BASE}>
                <div class="flex gap-2">
                    <div class={INPUT_GROUP}>
                        <input
                            type="text"
                            value={self.input.clone()}
                            placeholder="Add an answer"
                            maxlength={MAX_OPTION_LENGTH.to_string()}
                            class={INPUT_BASE}
                            oninput={ctx.link().callback(|e: InputEvent| {
                                let target = e.target_unchecked_into::<HtmlInputElement>();
                                Msg::UpdateInput(target.value())
                            })}
                            onkeypress={ctx.link().batch_callback(|e: KeyboardEvent| {
                                if e.key() == "Enter" {
                                    e.prevent_default();
                                    Some(Msg::Add)
                                } else {
                                    None
                                }
                            })}
                        />
                        <div class={TEXT_MUTED}>
                            {format!("Answers: {}/{}", self.options.len(), MAX_OPTIONS)}
                        </div>
                    </div>
                    <button
                        type="button"
                        onclick={ctx.link().callback(|_| Msg::Add)}
                        disabled={self.input.trim().is_empty() || full}
                        class={button_primary(false)}
                    >
                        {"Add"}
                    </button>
                </div>

                {if let Some(error) = &self.error {
                    html! { <div class={TEXT_ERROR}>{error}</div> }
                } else { html! {} }}

                <ul class={SPACE_Y_BASE}>
                    {for self.options.iter().enumerate().map(|(index, option)| html! {
                        <li class={combine_classes(CARD_SECTION, FLEX_BETWEEN)}>
                            <span class="text-white break-words flex-grow">{option}</span>
                            <div class="flex gap-2">
                                if index > 0 {
                                    <button type="button"
                                        onclick={ctx.link().callback(move |_| Msg::MoveUp(index))}
                                        class={combine_classes(BUTTON_BASE, BUTTON_WARNING)}>
                                        {"Up"}
                                    </button>
                                }
                                <button type="button"
                                    onclick={ctx.link().callback(move |_| Msg::Remove(index))}
                                    class={combine_classes(BUTTON_BASE, BUTTON_DANGER)}>
                                    {"Delete"}
                                </button>
                            </div>
                        </li>
                    })}
                </ul>
            </div>
        }
    }
}
