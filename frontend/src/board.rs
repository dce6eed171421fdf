use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use shared::{
    comment_thread_id, validate_comment, Action, Collection, Comment, CommentDraft,
    DispatchResult, Entity, Error, MutationKey, Phase, ReconcileError, Transition, MAX_COMMENT_LENGTH,
};
use uuid::Uuid;
use web_sys::{HtmlInputElement, HtmlTextAreaElement};
use yew::prelude::*;

use crate::api::{fetch_comments, fetch_participant, HttpStore};
use crate::live::{LiveView, SnapshotResult};
use crate::polls::{display_author, render_age};
use crate::styles::*;

pub enum Msg {
    Participant(Result<String, String>),
    PostsSnapshot(SnapshotResult),
    ThreadsSnapshot(SnapshotResult),
    Like(String),
    LikeDispatched(MutationKey, Option<DispatchResult>),
    ToggleComments(String),
    CommentsLoaded(String, Result<Vec<Comment>, String>),
    UpdateAuthor(String),
    UpdateDraft(String, String),
    SubmitComment(String),
    CommentDispatched(MutationKey, Option<DispatchResult>),
    DismissNotice(usize),
}

/// A comment sent but not yet listed by the server.
struct Outgoing {
    post_id: String,
    draft: CommentDraft,
}

pub struct Board {
    posts: LiveView,
    threads: LiveView,
    /// Who likes are counted for, as told by the server.
    participant_id: Option<String>,
    author: String,
    expanded: HashSet<String>,
    drafts: HashMap<String, String>,
    comments: HashMap<String, Vec<Comment>>,
    outbox: HashMap<MutationKey, Outgoing>,
    notices: Vec<String>,
}

impl Component for Board {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        ctx.link().send_future(async { Msg::Participant(fetch_participant().await) });
        let store = Rc::new(HttpStore::new());

        let mut posts = LiveView::new(Rc::clone(&store), Collection::Posts);
        posts.subscribe(ctx.link().callback(Msg::PostsSnapshot));
        let mut threads = LiveView::new(store, Collection::Comments);
        threads.subscribe(ctx.link().callback(Msg::ThreadsSnapshot));

        Self {
            posts,
            threads,
            participant_id: None,
            author: String::new(),
            expanded: HashSet::new(),
            drafts: HashMap::new(),
            comments: HashMap::new(),
            outbox: HashMap::new(),
            notices: Vec::new(),
        }
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
            Msg::PostsSnapshot(snapshot) => {
                self.posts.receive(snapshot);
                true
            }
            Msg::ThreadsSnapshot(snapshot) => {
                self.threads.receive(snapshot);
                true
            }
            Msg::Like(post_id) => {
                let Some(participant_id) = self.participant_id.clone() else {
                    self.notices.push("Still connecting, try again in a moment".into());
                    return true;
                };
                let on_done = ctx.link().callback(|(key, result): (MutationKey, Option<DispatchResult>)| Msg::LikeDispatched(key, result));
                match self.posts.act(Action::Like { post_id }, &participant_id, on_done) {
                    Ok(_) => true,
                    Err(ReconcileError::AlreadyParticipated { .. } | ReconcileError::DuplicatePending { .. }) => false,
                    Err(err) => {
                        self.notices.push(Error::from(&err).message);
                        true
                    }
                }
            }
            Msg::LikeDispatched(key, result) => {
                self.posts.complete(&key, result);
                self.collect_notices();
                true
            }
            Msg::ToggleComments(post_id) => {
                if !self.expanded.remove(&post_id) {
                    self.expanded.insert(post_id.clone());
                    self.load_comments(ctx, post_id);
                }
                true
            }
            Msg::CommentsLoaded(post_id, result) => {
                match result {
                    Ok(comments) => {
                        let listed: HashSet<String> = comments.iter().map(|c| c.id.to_string()).collect();
                        self.outbox.retain(|key, _| !listed.contains(&key.participant_id));
                        self.comments.insert(post_id, comments);
                    }
                    Err(error) => self.notices.push(error),
                }
                true
            }
            Msg::UpdateAuthor(author) => {
                self.author = author;
                true
            }
            Msg::UpdateDraft(post_id, body) => {
                self.drafts.insert(post_id, body);
                true
            }
            Msg::SubmitComment(post_id) => {
                let draft = CommentDraft {
                    author: self.author.trim().to_string(),
                    body: self.drafts.get(&post_id).cloned().unwrap_or_default(),
                };
                if let Err(err) = validate_comment(&draft) {
                    self.notices.push(err.to_string());
                    return true;
                }

                let action = Action::Comment {
                    post_id: post_id.clone(),
                    comment_id: Uuid::new_v4(),
                    draft: draft.clone(),
                };
                let on_done = ctx.link().callback(|(key, result): (MutationKey, Option<DispatchResult>)| Msg::CommentDispatched(key, result));
                // The comment id is the participant here.
                match self.threads.act(action, "", on_done) {
                    Ok(key) => {
                        self.drafts.remove(&post_id);
                        self.outbox.insert(key, Outgoing { post_id, draft });
                    }
                    Err(err) => self.notices.push(Error::from(&err).message),
                }
                true
            }
            Msg::CommentDispatched(key, result) => {
                let transition = self.threads.complete(&key, result);
                match transition {
                    Transition::RolledBack(_) | Transition::Cancelled => {
                        // Hand the text back so nothing typed is lost.
                        if let Some(outgoing) = self.outbox.remove(&key) {
                            self.drafts.entry(outgoing.post_id).or_insert(outgoing.draft.body);
                        }
                    }
                    Transition::Acknowledged | Transition::Settled | Transition::Ignored => {
                        if let Some(post_id) = self.outbox.get(&key).map(|o| o.post_id.clone()) {
                            self.load_comments(ctx, post_id);
                        }
                    }
                }
                self.collect_notices();
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
        self.posts.dispose();
        self.threads.dispose();
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let posts = self.posts.views();
        let on_author = ctx.link().callback(|e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            Msg::UpdateAuthor(input.value())
        });

        html! {
            <div class={CONTAINER}>
                <h1 class={combine_classes(HEADING_LG, "text-white")}>{"Dad Board"}</h1>
                {for self.notices.iter().enumerate().map(|(index, notice)| html! {
                    <div class={combine_classes(&alert_style(Tone::Error), FLEX_BETWEEN)}>
                        <span>{notice}</span>
                        <button type="button" class="ml-4 font-bold"
                            onclick={ctx.link().callback(move |_| Msg::DismissNotice(index))}>
                            {"×"}
                        </button>
                    </div>
                })}
                {if let Some(failure) = self.posts.stale().or(self.threads.stale()) {
                    html! { <div class={alert_style(Tone::Warning)}>{format!("Showing the last known counts ({})", failure)}</div> }
                } else { html! {} }}

                <div class={combine_classes(SPACE_Y_BASE, "mb-6")}>
                    <label class={TEXT_LABEL}>{"Comment as"}</label>
                    <input type="text" class={INPUT_BASE} value={self.author.clone()}
                        placeholder="Your name (optional)" oninput={on_author} />
                </div>

                <div class={SPACE_Y_LG}>
                    {for posts.iter().map(|post| self.render_post(ctx, post))}
                </div>

                {if !self.posts.is_loaded() {
                    html! {
                        <div class="flex justify-center p-8">
                            <div class={combine_classes("animate-pulse", TEXT_MUTED)}>{"Loading posts..."}</div>
                        </div>
                    }
                } else if posts.is_empty() {
                    html! { <p class={combine_classes(TEXT_MUTED, "text-center")}>{"Nothing posted yet."}</p> }
                } else { html! {} }}
            </div>
        }
    }
}

impl Board {
    fn collect_notices(&mut self) {
        for notice in self.posts.take_notices().into_iter().chain(self.threads.take_notices()) {
            self.notices.push(notice.message());
        }
    }

    fn load_comments(&self, ctx: &Context<Self>, post_id: String) {
        ctx.link().send_future(async move {
            let result = fetch_comments(&post_id).await;
            Msg::CommentsLoaded(post_id, result)
        });
    }

    fn render_post(&self, ctx: &Context<Self>, post: &Entity) -> Html {
        let participant_id = self.participant_id.as_deref().unwrap_or_default();
        let liked = post.has_participant(participant_id);
        let saving = self.posts.phase(&post.id, participant_id) == Phase::InFlight;
        let comment_count = self.threads.view(&comment_thread_id(&post.id))
            .map(|thread| thread.total_count)
            .unwrap_or(0);
        let expanded = self.expanded.contains(&post.id);

        let on_like = {
            let post_id = post.id.clone();
            ctx.link().callback(move |_| Msg::Like(post_id.clone()))
        };
        let on_toggle = {
            let post_id = post.id.clone();
            ctx.link().callback(move |_| Msg::ToggleComments(post_id.clone()))
        };

        html! {
            <div class={CARD_SECTION}>
                <div class={FLEX_BETWEEN}>
                    <h2 class={HEADING_SM}>{&post.title}</h2>
                    <span class={TEXT_MUTED}>{render_age(time::OffsetDateTime::now_utc() - post.created_at)}</span>
                </div>
                <p class="text-gray-200 whitespace-pre-line mb-2">{&post.body}</p>
                <p class={combine_classes(TEXT_MUTED, "mb-3")}>{format!("by {}", display_author(&post.author))}</p>

                <div class="flex gap-3">
                    <button type="button" onclick={on_like} disabled={liked}
                        class={combine_classes(BUTTON_BASE, if liked { BUTTON_SUCCESS } else { BUTTON_PRIMARY })}>
                        {format!("{} {}", if liked { "Liked" } else { "Like" }, post.total_count)}
                    </button>
                    <button type="button" onclick={on_toggle} class={combine_classes(BUTTON_BASE, "bg-gray-700 hover:bg-gray-600")}>
                        {format!("Comments {}", comment_count)}
                    </button>
                    {if saving {
                        html! { <span class={combine_classes(MEGA_PULSE, "self-center")}>{"Saving..."}</span> }
                    } else { html! {} }}
                </div>

                {if expanded { self.render_comments(ctx, &post.id) } else { html! {} }}
            </div>
        }
    }

    fn render_comments(&self, ctx: &Context<Self>, post_id: &str) -> Html {
        let draft = self.drafts.get(post_id).cloned().unwrap_or_default();
        let on_input = {
            let post_id = post_id.to_string();
            ctx.link().callback(move |e: InputEvent| {
                let area: HtmlTextAreaElement = e.target_unchecked_into();
                Msg::UpdateDraft(post_id.clone(), area.value())
            })
        };
        let on_submit = {
            let post_id = post_id.to_string();
            ctx.link().callback(move |e: SubmitEvent| {
                e.prevent_default();
                Msg::SubmitComment(post_id.clone())
            })
        };
        let sending = self.outbox.values().filter(|outgoing| outgoing.post_id == post_id);

        html! {
            <div class={combine_classes(SPACE_Y_BASE, "mt-4 border-t border-gray-700 pt-4")}>
                {match self.comments.get(post_id) {
                    Some(comments) => html! {
                        <>
                            {for comments.iter().map(|comment| html! {
                                <div class="bg-gray-900 rounded-md p-3">
                                    <p class="text-gray-200 whitespace-pre-line">{&comment.body}</p>
                                    <p class={TEXT_MUTED}>{display_author(&comment.author)}</p>
                                </div>
                            })}
                        </>
                    },
                    None => html! { <p class={combine_classes("animate-pulse", TEXT_MUTED)}>{"Loading comments..."}</p> },
                }}
                {for sending.map(|outgoing| html! {
                    <div class="bg-gray-900 rounded-md p-3 opacity-60">
                        <p class="text-gray-200 whitespace-pre-line">{&outgoing.draft.body}</p>
                        <p class={TEXT_MUTED}>{"Sending..."}</p>
                    </div>
                })}

                <form onsubmit={on_submit} class={SPACE_Y_BASE}>
                    <textarea class={INPUT_BASE} rows="3" value={draft.clone()}
                        maxlength={MAX_COMMENT_LENGTH.to_string()} oninput={on_input}
                        placeholder="Share some encouragement" />
                    <button type="submit" class={button_primary(false)} disabled={draft.trim().is_empty()}>
                        {"Comment"}
                    </button>
                </form>
            </div>
        }
    }
}
