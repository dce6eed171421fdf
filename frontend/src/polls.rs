use std::rc::Rc;

use shared::{Action, Collection, DispatchResult, Entity, Error, MutationKey, Phase, ReconcileError};
use time::{Duration, OffsetDateTime};
use yew::prelude::*;

use crate::api::{fetch_participant, HttpStore};
use crate::live::{LiveView, SnapshotResult};
use crate::styles::*;

pub enum Msg {
    Participant(Result<String, String>),
    Snapshot(SnapshotResult),
    Vote { poll_id: String, option_id: String },
    Dispatched(MutationKey, Option<DispatchResult>),
    DismissNotice(usize),
}

pub struct Polls {
    polls: LiveView,
    participant_id: Option<String>,
    notices: Vec<String>,
}

impl Component for Polls {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        ctx.link().send_future(async { Msg::Participant(fetch_participant().await) });
        let mut polls = LiveView::new(Rc::new(HttpStore::new()), Collection::Polls);
        polls.subscribe(ctx.link().callback(Msg::Snapshot));

        Self { polls, participant_id: None, notices: Vec::new() }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Participant(Ok(id)) => {
                self.participant_id = Some(id);
                true
            }
            Msg::Participant(Err(error)) => {
                self.notices.push(error);
                true
            }
            Msg::Snapshot(snapshot) => {
                self.polls.receive(snapshot);
                true
            }
            Msg::Vote { poll_id, option_id } => {
                let Some(participant_id) = self.participant_id.clone() else {
                    self.notices.push("Still connecting, try again in a moment".into());
                    return true;
                };
                let on_done = ctx.link().callback(|(key, result): (MutationKey, Option<DispatchResult>)| Msg::Dispatched(key, result));
                match self.polls.act(Action::Vote { poll_id, option_id }, &participant_id, on_done) {
                    Ok(_) => true,
                    // Double clicks land here; the first vote already shows.
                    Err(ReconcileError::AlreadyParticipated { .. } | ReconcileError::DuplicatePending { .. }) => false,
                    Err(err) => {
                        self.notices.push(Error::from(&err).message);
                        true
                    }
                }
            }
            Msg::Dispatched(key, result) => {
                self.polls.complete(&key, result);
                self.notices.extend(self.polls.take_notices().iter().map(|notice| notice.message()));
                true
            }
            Msg::DismissNotice(index) => {
                if index < self.notices.len() {
                    self.notices.remove(index);
                }
                true
            }
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.polls.dispose();
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let polls = self.polls.views();

        html! {
            <div class={CONTAINER}>
                <h1 class={combine_classes(HEADING_LG, "text-white")}>{"Polls"}</h1>
                {self.render_notices(ctx)}

                {if let Some(failure) = self.polls.stale() {
                    html! { <div class={alert_style(Tone::Warning)}>{format!("Showing the last known results ({})", failure)}</div> }
                } else { html! {} }}

                <div class={SPACE_Y_LG}>
                    {for polls.iter().map(|poll| self.render_poll(ctx, poll))}
                </div>

                {if !self.polls.is_loaded() {
                    html! {
                        <div class="flex justify-center p-8">
                            <div class={combine_classes("animate-pulse", TEXT_MUTED)}>{"Loading polls..."}</div>
                        </div>
                    }
                } else if polls.is_empty() {
                    html! { <p class={combine_classes(TEXT_MUTED, "text-center")}>{"No polls yet. Start one!"}</p> }
                } else { html! {} }}
            </div>
        }
    }
}

impl Polls {
    fn render_notices(&self, ctx: &Context<Self>) -> Html {
        html! {
            <>
                {for self.notices.iter().enumerate().map(|(index, notice)| html! {
                    <div class={combine_classes(&alert_style(Tone::Error), FLEX_BETWEEN)}>
                        <span>{notice}</span>
                        <button type="button" class="ml-4 font-bold"
                            onclick={ctx.link().callback(move |_| Msg::DismissNotice(index))}>
                            {"×"}
                        </button>
                    </div>
                })}
            </>
        }
    }

    fn render_poll(&self, ctx: &Context<Self>, poll: &Entity) -> Html {
        let participant_id = self.participant_id.as_deref().unwrap_or_default();
        let chosen = poll.participation_of(participant_id).map(|item| item.id.clone());
        let status = match self.polls.phase(&poll.id, participant_id) {
            Phase::InFlight => "Saving your vote...",
            Phase::AwaitingSnapshot => "Vote saved",
            Phase::Idle if chosen.is_some() => "You voted",
            Phase::Idle => "",
        };

        html! {
            <div class={CARD_SECTION}>
                <div class={FLEX_BETWEEN}>
                    <h2 class={HEADING_SM}>{&poll.title}</h2>
                    <span class={TEXT_MUTED}>{render_age(OffsetDateTime::now_utc() - poll.created_at)}</span>
                </div>
                {if !poll.body.is_empty() {
                    html! { <p class={combine_classes(TEXT_MUTED, "mb-3")}>{&poll.body}</p> }
                } else { html! {} }}

                <div class={SPACE_Y_BASE}>
                    {for poll.sub_items.iter().map(|option| {
                        let percent = if poll.total_count == 0 {
                            0
                        } else {
                            option.count * 100 / poll.total_count
                        };
                        let selected = chosen.as_deref() == Some(option.id.as_str());
                        let onclick = {
                            let poll_id = poll.id.clone();
                            let option_id = option.id.clone();
                            ctx.link().callback(move |_| Msg::Vote { poll_id: poll_id.clone(), option_id: option_id.clone() })
                        };

                        html! {
                            <button type="button" {onclick} disabled={chosen.is_some()}
                                class={classes!(
                                    "relative", "w-full", "text-left", "rounded-lg", "overflow-hidden",
                                    "border", "px-4", "py-3", "disabled:cursor-default",
                                    if selected { "border-blue-400 ring-2 ring-blue-500" } else { "border-gray-600 hover:border-blue-400" }
                                )}>
                                <div class="absolute inset-y-0 left-0 bg-blue-900 transition-all duration-300"
                                    style={format!("width: {}%", percent)} />
                                <div class={combine_classes("relative text-white", FLEX_BETWEEN)}>
                                    <span class="break-words">{&option.label}</span>
                                    <span class="font-mono">{format!("{} ({}%)", option.count, percent)}</span>
                                </div>
                            </button>
                        }
                    })}
                </div>

                <div class={combine_classes(FLEX_BETWEEN, "mt-3")}>
                    <span class={TEXT_MUTED}>{format!("{} votes · by {}", poll.total_count, display_author(&poll.author))}</span>
                    <span class={if status == "Saving your vote..." { MEGA_PULSE } else { TEXT_MUTED }}>{status}</span>
                </div>
            </div>
        }
    }
}

pub fn display_author(author: &str) -> &str {
    if author.trim().is_empty() { "Anonymous dad" } else { author }
}

pub fn render_age(d: Duration) -> String {
    if d.whole_days() > 0 {
        format!("{}d ago", d.whole_days())
    } else if d.whole_hours() > 0 {
        format!("{}h ago", d.whole_hours())
    } else if d.whole_minutes() > 0 {
        format!("{}m ago", d.whole_minutes())
    } else {
        "just now".to_string()
    }
}
