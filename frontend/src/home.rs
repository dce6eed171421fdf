use yew::prelude::*;
use yew_router::prelude::*;
use crate::{Route, styles::*};

#[function_component]
pub fn Home() -> Html {
    html! {
        <div class={CONTAINER}>
            <h1 class={combine_classes(HEADING_LG, "text-white")}>{"DadCircle"}</h1>

            <div class="space-y-8 max-w-3xl mx-auto">
                <div class="bg-gray-800 p-6 rounded-lg shadow-lg">
                    <p class="text-gray-300 mb-4">
                        {"A small corner of the internet for fathers to swap advice, ask the group
                        a quick question and cheer each other on."}
                    </p>
                    <p class="text-gray-300">
                        {"Votes, likes and comments show up the moment you tap. If the server can't
                        confirm them you'll see a short notice and the count goes back to what it was."}
                    </p>
                </div>

                <div class="bg-gray-800 p-6 rounded-lg shadow-lg">
                    <h2 class="text-xl font-semibold mb-4 text-white">{"House Rules"}</h2>
                    <ul class="list-disc pl-6 space-y-3 text-gray-300">
                        <li>{"One vote per poll, and it can't be changed"}</li>
                        <li>{"Like a post once"}</li>
                        <li>{"Keep it kind. Profanity is filtered"}</li>
                    </ul>
                </div>

                <div class="bg-gray-800 p-6 rounded-lg shadow-lg">
                    <h2 class="text-xl font-semibold mb-4 text-white">{"Get Started"}</h2>
                    <div class="flex flex-col sm:flex-row gap-4 justify-center">
                        <Link<Route> to={Route::Polls}
                            classes="bg-blue-600 hover:bg-blue-700 text-white px-8 py-3 rounded-lg text-lg font-semibold text-center transition-colors">
                            {"Browse Polls"}
                        </Link<Route>>
                        <Link<Route> to={Route::Board}
                            classes="bg-green-600 hover:bg-green-700 text-white px-8 py-3 rounded-lg text-lg font-semibold text-center transition-colors">
                            {"Read the Board"}
                        </Link<Route>>
                    </div>
                </div>
            </div>
        </div>
    }
}
