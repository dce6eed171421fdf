use yew::prelude::*;
use yew_router::prelude::*;

mod styles;
mod api;
mod live;
mod home;
mod polls;
mod board;
mod option_manager;
mod poll_create;
mod post_create;
mod config;

use crate::{
    board::Board,
    home::Home,
    polls::Polls,
    poll_create::PollCreate,
    post_create::PostCreate,
};

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")] Home,
    #[at("/polls")] Polls,
    #[at("/board")] Board,
    #[at("/polls/new")] CreatePoll,
    #[at("/board/new")] CreatePost,
}

fn nav_link(route: Route, label: &'static str, current: &Option<Route>) -> Html {
    let active = current.as_ref() == Some(&route);
    html! {
        <Link<Route> to={route} classes={classes!(
            "text-base", "md:text-lg", "font-medium", "px-4", "py-2", "rounded-md",
            "transition-colors", "duration-200", "ease-in-out",
            "text-gray-200", "border", "border-transparent", "hover:border-blue-400", "hover:text-blue-400",
            if active {
                "text-blue-400 border-blue-400 ring-2 ring-blue-500 ring-offset-1 ring-offset-gray-900"
            } else {
                ""
            }
        )}>
            {label}
        </Link<Route>>
    }
}

#[function_component(Navigation)]
fn navigation() -> Html {
    let current_route = use_route::<Route>();

    html! {
        <nav class="bg-gray-900 shadow-lg fixed top-0 w-full z-50">
            <div class="container mx-auto px-6 py-4 flex justify-center space-x-4 md:space-x-8">
                {nav_link(Route::Home, "Home", &current_route)}
                {nav_link(Route::Polls, "Polls", &current_route)}
                {nav_link(Route::Board, "Board", &current_route)}
                {nav_link(Route::CreatePoll, "New Poll", &current_route)}
                {nav_link(Route::CreatePost, "New Post", &current_route)}
            </div>
        </nav>
    }
}

#[function_component(App)]
fn app() -> Html {
    html! {
        <BrowserRouter>
            <div class="min-h-screen bg-gray-900">
                <Navigation />
                <div class="pt-16">
                    <Switch<Route> render={switch} />
                </div>
            </div>
        </BrowserRouter>
    }
}

fn switch(routes: Route) -> Html {
    match routes {
        Route::Home => html! { <Home /> },
        Route::Polls => html! { <Polls /> },
        Route::Board => html! { <Board /> },
        Route::CreatePoll => html! { <PollCreate /> },
        Route::CreatePost => html! { <PostCreate /> },
    }
}

fn main() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
    yew::Renderer::<App>::new().render();
}
