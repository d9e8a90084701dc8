//! Screen controller
//!
//! [`App`] ties a [`Session`] to the front end: it switches screens, runs the
//! polling loop and the sound scheduler while the game screen is open, and
//! turns session results into views, feedback and error messages for a
//! [`Renderer`].
//!
//! Like the rest of the crate the controller never waits. Timed work is
//! requested through a `schedule_message` callback and comes back through
//! [`App::receive_alarm`].

use derive_where::derive_where;
use serde::Serialize;
use tracing::{info, warn};
use web_time::{Duration, Instant};

use crate::{
    AlarmMessage,
    config::GameConfig,
    constants::timing::ERROR_LIFETIME,
    player::Caught,
    progression::{self, Submission},
    session::{self, Session},
    sound::{Cue, CuePlayer, Event, SoundScheduler},
    state::Join,
    store::Storage,
    sync::SyncLoop,
    view::{Feedback, Role, View},
};

/// The screens of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Screen {
    /// Choose between hosting and joining
    Welcome,
    /// Configure levels, lives and sound
    HostSetup,
    /// Enter game code and name
    Join,
    /// The running game
    Game,
}

/// Draws what the controller decides to show
pub trait Renderer {
    /// Switches to another screen
    fn show_screen(&mut self, screen: Screen);

    /// Redraws the game screen
    fn render(&mut self, view: &View);

    /// Shows the result of a player action
    fn feedback(&mut self, feedback: &Feedback);

    /// Shows an error on a screen for `lifetime`
    fn error(&mut self, screen: Screen, message: &str, lifetime: Duration);

    /// Updates the countdown to the next sound cue
    fn countdown(&mut self, seconds: u64);

    /// Signals that a cue just started playing
    fn cue_played(&mut self);

    /// Displays the link other devices can join with
    fn share_link(&mut self, url: &str);
}

/// The controller of one device
#[derive_where(Debug; S: std::fmt::Debug)]
pub struct App<S, R, P> {
    session: Session<S>,
    screen: Screen,
    sync: SyncLoop,
    sound: SoundScheduler,
    #[derive_where(skip)]
    renderer: R,
    #[derive_where(skip)]
    cue_player: P,
}

impl<S, R, P> App<S, R, P>
where
    S: Storage,
    R: Renderer,
    P: CuePlayer,
{
    /// Creates a controller on the welcome screen
    pub fn new(storage: S, renderer: R, cue_player: P) -> Self {
        Self {
            session: Session::new(storage),
            screen: Screen::Welcome,
            sync: SyncLoop::new(),
            sound: SoundScheduler::new(),
            renderer,
            cue_player,
        }
    }

    /// The session of this device
    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    /// The screen currently shown
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// The renderer
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The cue player
    pub fn cue_player(&self) -> &P {
        &self.cue_player
    }

    /// Whether the sound scheduler is running
    pub fn is_sound_running(&self) -> bool {
        self.sound.is_running()
    }

    /// Whether the polling loop is running
    pub fn is_syncing(&self) -> bool {
        self.sync.is_running()
    }

    /// Starts the controller from the URL the page was opened with
    ///
    /// A URL carrying a game bootstraps the local copy and sends devices
    /// that do not host it to the join screen. Otherwise the records of an
    /// earlier run are restored, resuming the game screen if this device
    /// hosts or joined the stored game.
    pub fn boot<F>(&mut self, url: &str, now: Instant, schedule_message: F)
    where
        F: FnMut(AlarmMessage, Duration),
    {
        let screen = match self.session.open_link(url) {
            Ok(true) if self.session.is_granny() => Screen::Game,
            Ok(true) => Screen::Join,
            Ok(false) => match self.session.restore() {
                Ok(true) if self.session.role() != Role::Spectator => Screen::Game,
                Ok(_) => Screen::Welcome,
                Err(e) => {
                    self.report(Screen::Welcome, &e);
                    Screen::Welcome
                }
            },
            Err(e) => {
                self.report(Screen::Welcome, &e);
                Screen::Welcome
            }
        };

        info!(?screen, role = ?self.session.role(), "booted");
        self.show(screen, now, schedule_message);
    }

    /// Switches screens
    ///
    /// Every timer is cancelled first. Entering the game screen starts the
    /// polling loop, the sound scheduler and the countdown, and renders.
    pub fn show<F>(&mut self, screen: Screen, now: Instant, mut schedule_message: F)
    where
        F: FnMut(AlarmMessage, Duration),
    {
        self.sync.stop();
        self.sound.stop();
        self.screen = screen;
        self.renderer.show_screen(screen);

        if screen != Screen::Game {
            return;
        }
        let Some(settings) = self.session.state().map(|state| *state.sound_settings()) else {
            return;
        };

        self.sync.start(&mut schedule_message);
        self.sound.start(settings, now, &mut schedule_message);
        if let Some(seconds) = self.sound.remaining_secs(now) {
            self.renderer.countdown(seconds);
        }
        self.render();
    }

    /// Creates a game hosted by this device and enters it
    ///
    /// Returns the share link.
    pub fn host_game<F>(
        &mut self,
        config: &GameConfig,
        base_url: &str,
        now: Instant,
        schedule_message: F,
    ) -> Result<String, session::Error>
    where
        F: FnMut(AlarmMessage, Duration),
    {
        let hosted = self.session.host(config).map(|_| ());
        let link = hosted
            .and_then(|()| self.session.share_link(base_url))
            .inspect_err(|e| self.report(Screen::HostSetup, e))?;

        self.renderer.share_link(&link);
        self.show(Screen::Game, now, schedule_message);
        Ok(link)
    }

    /// Joins the stored game and enters it
    pub fn join<F>(
        &mut self,
        game_code: &str,
        name: &str,
        now: Instant,
        schedule_message: F,
    ) -> Result<Join, session::Error>
    where
        F: FnMut(AlarmMessage, Duration),
    {
        let join = self
            .session
            .join(game_code, name)
            .inspect_err(|e| self.report(Screen::Join, e))?;
        self.show(Screen::Game, now, schedule_message);
        Ok(join)
    }

    /// Joins the game from a share link and enters it
    pub fn join_from_link<F>(
        &mut self,
        name: &str,
        now: Instant,
        schedule_message: F,
    ) -> Result<Join, session::Error>
    where
        F: FnMut(AlarmMessage, Duration),
    {
        let join = self
            .session
            .join_from_link(name)
            .inspect_err(|e| self.report(Screen::Join, e))?;
        self.show(Screen::Game, now, schedule_message);
        Ok(join)
    }

    /// Submits a code typed on the game screen
    pub fn submit_code(&mut self, input: &str) -> Result<Submission, session::Error> {
        match self.session.submit_code(input) {
            Ok(submission) => {
                self.renderer
                    .feedback(&Feedback::from_submission(submission));
                self.render();
                Ok(submission)
            }
            Err(e @ session::Error::Progression(progression::Error::InvalidCode(_))) => {
                self.renderer.feedback(&Feedback::InvalidCode);
                Err(e)
            }
            Err(e) => {
                self.report(Screen::Game, &e);
                Err(e)
            }
        }
    }

    /// Records that Granny caught the player on this device
    pub fn player_caught(&mut self) -> Result<Caught, session::Error> {
        let caught = self
            .session
            .player_caught()
            .inspect_err(|e| self.report(Screen::Game, e))?;

        if let Some(feedback) = Feedback::from_caught(caught) {
            self.renderer.feedback(&feedback);
        }
        self.render();
        Ok(caught)
    }

    /// Plays the preview cue from the setup screen
    pub fn preview_sound(&mut self, volume: u32) {
        self.cue_player.play(&Cue::preview(volume));
    }

    /// Handles an alarm requested earlier through `schedule_message`
    pub fn receive_alarm<F>(&mut self, message: AlarmMessage, now: Instant, mut schedule_message: F)
    where
        F: FnMut(AlarmMessage, Duration),
    {
        match message {
            AlarmMessage::Sync(message) => {
                match self
                    .sync
                    .receive_alarm(&mut self.session, &mut schedule_message, &message)
                {
                    Ok(true) => self.render(),
                    Ok(false) | Err(_) => {}
                }
            }
            AlarmMessage::Sound(message) => {
                match self.sound.receive_alarm(
                    &mut self.cue_player,
                    &mut schedule_message,
                    &message,
                    now,
                ) {
                    Some(Event::CuePlayed(_)) => self.renderer.cue_played(),
                    Some(Event::Countdown(seconds)) => self.renderer.countdown(seconds),
                    None => {}
                }
            }
        }
    }

    fn render(&mut self) {
        if let Some(view) = self.session.view() {
            self.renderer.render(&view);
        }
    }

    fn report(&mut self, screen: Screen, error: &session::Error) {
        warn!(?screen, kind = ?error.kind(), %error, "action failed");
        self.renderer.error(screen, &error.to_string(), ERROR_LIFETIME);
    }
}
