mod client;
mod config;
mod controller;
mod query;
mod view;

use iced::{
    widget::{button, column, container, row, scrollable, text, text_input, text_input::Id, Column},
    Element, Length, Task, Theme, Font, Subscription,
    font, time, clipboard,
    keyboard::{self, Key},
    event::{self, Event as IcedEvent},
    alignment, Padding,
    window,
};
use std::time::Duration;

use client::{QueryClient, QueryError, QueryTransport};
use controller::{Controller, Submission};
use query::QueryResponse;
use view::{SourceRow, SourcesView};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "car_search=info".into());

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn main() -> iced::Result {
    init_tracing();

    let config = config::Config::load();
    let size = iced::Size::new(config.window.width as f32, config.window.height as f32);
    let min_size = iced::Size::new(config.window.min_width as f32, config.window.min_height as f32);

    iced::application("Car Search", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size,
            min_size: Some(min_size),
            position: window::Position::Centered,
            ..Default::default()
        })
        .default_font(Font::MONOSPACE)
        .run_with(move || App::new(config))
}

#[derive(Debug, Clone)]
enum Message {
    InputChanged(String),
    Submit,
    ResponseReceived(Result<QueryResponse, QueryError>),
    Tick,
    CopyAnswer,
    Exit,
}

struct App {
    input_text: String,
    controller: Controller,
    loading_frame: usize,
    client: QueryClient,
    input_id: Id,
}

impl App {
    fn new(config: config::Config) -> (Self, Task<Message>) {
        let client = QueryClient::new(&config.api);
        tracing::info!(endpoint = client.endpoint(), "Query client ready");

        let input_id = Id::unique();

        let app = App {
            input_text: String::new(),
            controller: Controller::new(),
            loading_frame: 0,
            client,
            input_id: input_id.clone(),
        };

        (app, text_input::focus(input_id))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InputChanged(value) => {
                self.input_text = value;
                Task::none()
            }
            Message::Submit => match self.controller.submit(&self.input_text) {
                Submission::Dispatch(query) => {
                    self.loading_frame = 0;
                    let client = self.client.clone();

                    Task::future(async move {
                        Message::ResponseReceived(client.send(&query).await)
                    })
                }
                Submission::Rejected | Submission::Ignored => Task::none(),
            },
            Message::ResponseReceived(outcome) => {
                self.controller.complete(outcome);
                Task::none()
            }
            Message::Tick => {
                if self.controller.is_in_flight() {
                    self.loading_frame = (self.loading_frame + 1) % SPINNER_FRAMES.len();
                }
                Task::none()
            }
            Message::CopyAnswer => {
                let vm = view::render(self.controller.state());
                if vm.result_visible {
                    clipboard::write(vm.answer)
                } else {
                    Task::none()
                }
            }
            Message::Exit => {
                iced::exit()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if self.controller.is_in_flight() {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| {
            if let IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) = event
            {
                Some(Message::Exit)
            } else {
                None
            }
        });

        Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<Message> {
        let vm = view::render(self.controller.state());

        let input = text_input("Describe the car you're looking for...", &self.input_text)
            .on_input(Message::InputChanged)
            .on_submit(Message::Submit)
            .padding(15)
            .size(18)
            .id(self.input_id.clone());

        let submit = button(text("Search").size(16))
            .on_press_maybe(vm.submit_enabled.then_some(Message::Submit))
            .padding(15);

        let mut content = column![row![input, submit].spacing(10)]
            .spacing(15)
            .padding(10);

        if vm.loading_visible {
            content = content.push(
                container(
                    row![
                        text(SPINNER_FRAMES[self.loading_frame]).size(24),
                        text("Searching listings...").size(15),
                    ]
                    .spacing(10)
                    .align_y(alignment::Vertical::Center),
                )
                .width(Length::Fill)
                .align_x(alignment::Horizontal::Center),
            );
        }

        if vm.error_visible {
            content = content.push(text(vm.error.clone()).size(15).style(text::danger));
        }

        if vm.result_visible {
            let result = column![text(vm.answer.clone()).size(15), sources_view(&vm.sources)]
                .spacing(15);

            content = content.push(
                scrollable(container(result).padding(15).width(Length::Fill))
                    .height(Length::Fill),
            );

            let copy_button = container(
                button(text("[Copy]").size(14))
                    .on_press(Message::CopyAnswer)
                    .padding(10)
            )
            .width(Length::Fill)
            .align_x(alignment::Horizontal::Right)
            .padding(Padding::from([10, 10]));

            content = content.push(copy_button);
        }

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}

fn sources_view(sources: &SourcesView) -> Element<'static, Message> {
    match sources {
        SourcesView::Hidden => column![].into(),
        SourcesView::Empty(notice) => text(*notice).size(13).into(),
        SourcesView::Rows(rows) => {
            Column::with_children(rows.iter().map(source_row)).spacing(12).into()
        }
    }
}

fn source_row(row: &SourceRow) -> Element<'static, Message> {
    let bold = Font {
        weight: font::Weight::Bold,
        ..Font::MONOSPACE
    };

    column![
        text(row.heading.clone()).size(15).font(bold),
        text(row.details.clone()).size(13),
        text(row.title.clone()).size(13),
    ]
    .spacing(4)
    .into()
}
