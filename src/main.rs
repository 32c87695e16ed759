mod client;
mod config;
mod controller;
mod conversation;
mod error;
mod render;

use iced::{
    widget::{button, column, container, row, scrollable, text, text_input, Column, Row},
    alignment,
    font::{Style, Weight},
    time, Element, Font, Length, Subscription, Task, Theme,
};
use std::time::Duration;

use client::{ChatClient, ChatReply};
use config::{Config, WelcomeConfig};
use controller::{ChatController, Effect};
use conversation::{ChatMessage, Entry, Sender};
use error::ChatError;
use render::{Fragment, SourceView};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();
    let client = ChatClient::from_config(&config.server)?;
    tracing::info!(base_url = %client.base_url(), "starting policy chat");

    let window = iced::window::Settings {
        size: iced::Size::new(config.window.width as f32, config.window.height as f32),
        min_size: Some(iced::Size::new(
            config.window.min_width as f32,
            config.window.min_height as f32,
        )),
        position: iced::window::Position::Centered,
        ..Default::default()
    };

    iced::application("MAF Policy Bot", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window)
        .default_font(Font::MONOSPACE)
        .run_with(move || App::new(client, config.welcome))?;

    Ok(())
}

#[derive(Debug, Clone)]
enum Message {
    InputChanged(String),
    Submit,
    ChatCompleted(Result<ChatReply, ChatError>),
    Clear,
    ClearCompleted(Result<(), ChatError>),
    OpenSource(String),
    Tick,
}

struct App {
    controller: ChatController,
    client: ChatClient,
    welcome: WelcomeConfig,
    loading_frame: usize,
    input_id: text_input::Id,
    transcript_id: scrollable::Id,
}

impl App {
    fn new(client: ChatClient, welcome: WelcomeConfig) -> (Self, Task<Message>) {
        let input_id = text_input::Id::unique();

        let app = App {
            controller: ChatController::new(),
            client,
            welcome,
            loading_frame: 0,
            input_id: input_id.clone(),
            transcript_id: scrollable::Id::unique(),
        };

        (app, text_input::focus(input_id))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InputChanged(value) => {
                self.controller.set_input(value);
                Task::none()
            }
            Message::Submit => {
                let effects = self.controller.submit();
                self.run(effects)
            }
            Message::ChatCompleted(result) => {
                let effects = self.controller.complete(result);
                self.run(effects)
            }
            Message::Clear => {
                let effects = self.controller.clear();
                self.run(effects)
            }
            Message::ClearCompleted(result) => {
                let effects = self.controller.clear_completed(result);
                self.run(effects)
            }
            Message::OpenSource(href) => {
                match self.client.resolve_link(&href) {
                    Some(url) => {
                        if let Err(e) = open::that(url.as_str()) {
                            tracing::warn!(%url, error = %e, "failed to open source");
                        }
                    }
                    None => tracing::debug!(%href, "source has no link target"),
                }
                Task::none()
            }
            Message::Tick => {
                self.loading_frame = (self.loading_frame + 1) % SPINNER_FRAMES.len();
                Task::none()
            }
        }
    }

    fn run(&self, effects: Vec<Effect>) -> Task<Message> {
        Task::batch(effects.into_iter().map(|effect| match effect {
            Effect::FocusInput => text_input::focus(self.input_id.clone()),
            Effect::ScrollToEnd => scrollable::snap_to(
                self.transcript_id.clone(),
                scrollable::RelativeOffset::END,
            ),
            Effect::SendChat(text) => {
                let client = self.client.clone();
                Task::future(async move { Message::ChatCompleted(client.send(&text).await) })
            }
            Effect::SendClear => {
                let client = self.client.clone();
                Task::future(async move { Message::ClearCompleted(client.clear().await) })
            }
        }))
    }

    fn subscription(&self) -> Subscription<Message> {
        if self.controller.conversation().is_loading() {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let header = row![
            container(text(self.welcome.title.as_str()).size(18).font(styled(true, false)))
                .width(Length::Fill),
            button(text("Clear").size(14))
                .on_press(Message::Clear)
                .padding(8)
                .style(button::secondary),
        ]
        .align_y(alignment::Vertical::Center)
        .spacing(10);

        let entries = Column::with_children(
            self.controller
                .conversation()
                .entries()
                .iter()
                .map(|entry| self.view_entry(entry)),
        )
        .spacing(12)
        .padding(15);

        let transcript = scrollable(entries)
            .id(self.transcript_id.clone())
            .height(Length::Fill);

        let mut input = text_input("Ask about tobacco legislation...", self.controller.input())
            .padding(15)
            .size(16)
            .id(self.input_id.clone());
        if self.controller.input_enabled() {
            input = input
                .on_input(Message::InputChanged)
                .on_submit(Message::Submit);
        }

        container(column![header, transcript, input].spacing(10).padding(10))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn view_entry<'a>(&'a self, entry: &'a Entry) -> Element<'a, Message> {
        match entry {
            Entry::Welcome => container(
                column![
                    text(self.welcome.title.as_str()).size(18).font(styled(true, false)),
                    text(self.welcome.body.as_str()).size(15),
                ]
                .spacing(8),
            )
            .padding(15)
            .width(Length::Fill)
            .style(container::bordered_box)
            .into(),
            Entry::Message(message) => self.view_message(message),
        }
    }

    fn view_message<'a>(&'a self, message: &'a ChatMessage) -> Element<'a, Message> {
        let mut content = Column::new().spacing(10);

        if message.loading {
            content = content.push(
                row![
                    text(SPINNER_FRAMES[self.loading_frame]).size(18),
                    text(message.text.as_str()).size(15).font(styled(false, true)),
                ]
                .spacing(8),
            );
        } else {
            content = content.push(view_fragments(render::format_text(message.text.as_str())));
        }

        if !message.sources.is_empty() {
            content = content.push(view_sources(render::source_views(&message.sources)));
        }

        let bubble = container(content)
            .padding(12)
            .max_width(720.0)
            .style(container::rounded_box);

        let align = match message.sender {
            Sender::User => alignment::Horizontal::Right,
            Sender::Assistant => alignment::Horizontal::Left,
        };

        container(bubble).width(Length::Fill).align_x(align).into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}

fn styled(bold: bool, italic: bool) -> Font {
    Font {
        weight: if bold { Weight::Bold } else { Weight::Normal },
        style: if italic { Style::Italic } else { Style::Normal },
        ..Font::MONOSPACE
    }
}

fn view_fragments(fragments: Vec<Fragment>) -> Element<'static, Message> {
    let mut lines: Vec<Vec<Element<'static, Message>>> = vec![Vec::new()];

    for fragment in fragments {
        match fragment {
            Fragment::LineBreak => lines.push(Vec::new()),
            Fragment::Text { text: content, bold, italic } => {
                if let Some(line) = lines.last_mut() {
                    line.push(text(content).size(15).font(styled(bold, italic)).into());
                }
            }
        }
    }

    // Empty rows collapse, so blank lines get a spacer.
    Column::with_children(lines.into_iter().map(|line| {
        if line.is_empty() {
            text(" ").size(15).into()
        } else {
            Row::with_children(line).into()
        }
    }))
    .into()
}

fn view_sources(sources: Vec<SourceView>) -> Element<'static, Message> {
    let mut list = Column::new()
        .spacing(6)
        .push(text(render::SOURCES_HEADING).size(14).font(styled(true, false)));

    for (i, source) in sources.into_iter().enumerate() {
        let link = button(text(source.link_text).size(14))
            .on_press(Message::OpenSource(source.href))
            .padding(0)
            .style(button::text);

        let mut item = Column::new().spacing(2).push(
            row![text(format!("{}.", i + 1)).size(14), link, text(source.annotation).size(14)]
                .spacing(6)
                .align_y(alignment::Vertical::Center),
        );

        if let Some(preview) = source.preview {
            item = item.push(
                container(text(format!("\"{}\"", preview)).size(13).font(styled(false, true)))
                    .padding([0, 20]),
            );
        }

        list = list.push(item);
    }

    list.into()
}
