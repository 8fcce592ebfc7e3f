use anyhow::{anyhow, Result};
use tracing::{debug, instrument};
use xcb::{
    randr::GetMonitors,
    screensaver::{QueryInfo, QueryInfoReply},
    x::{Atom, Drawable, GetGeometry, GetProperty, InternAtom, TranslateCoordinates, Window, ATOM_ANY},
    Connection, Xid,
};

use super::{nearest_monitor, DesktopApi, ForegroundGeometry, Rect};

fn get_active_window_atom(conn: &Connection) -> Result<Atom> {
    let active_window_atom = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name: b"_NET_ACTIVE_WINDOW",
    }))?;
    Ok(active_window_atom.atom())
}

fn get_active_window(conn: &Connection, root: Window, active_window_atom: Atom) -> Result<Option<Window>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    Ok(result
        .value::<Window>()
        .first()
        .copied()
        .filter(|window| !window.is_none()))
}

/// Window bounds translated into root coordinates.
fn get_window_rect(conn: &Connection, window: Window, root: Window) -> Result<Rect> {
    let geometry = conn.wait_for_reply(conn.send_request(&GetGeometry {
        drawable: Drawable::Window(window),
    }))?;
    let origin = conn.wait_for_reply(conn.send_request(&TranslateCoordinates {
        src_window: window,
        dst_window: root,
        src_x: 0,
        src_y: 0,
    }))?;
    Ok(Rect::from_origin(
        origin.dst_x() as i32,
        origin.dst_y() as i32,
        geometry.width() as u32,
        geometry.height() as u32,
    ))
}

fn get_monitor_rects(conn: &Connection, root: Window) -> Result<Vec<Rect>> {
    let reply = conn.wait_for_reply(conn.send_request(&GetMonitors {
        window: root,
        get_active: true,
    }))?;
    Ok(reply
        .monitors()
        .map(|monitor| {
            Rect::from_origin(
                monitor.x() as i32,
                monitor.y() as i32,
                monitor.width() as u32,
                monitor.height() as u32,
            )
        })
        .collect())
}

pub struct X11DesktopApi {
    connection: Connection,
    preferred_screen: usize,
    active_window_atom: Atom,
}

impl X11DesktopApi {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = Connection::connect_with_extensions(
            None,
            &[xcb::Extension::ScreenSaver],
            &[xcb::Extension::RandR],
        )?;
        let active_window_atom = get_active_window_atom(&connection)?;
        Ok(Self {
            connection,
            preferred_screen: preferred_screen.max(0) as usize,
            active_window_atom,
        })
    }

    /// Root window and its size. Currently the application only supports 1 x11 screen.
    fn root(&self) -> Result<(Window, Rect)> {
        let setup = self.connection.get_setup();
        let screen = setup
            .roots()
            .nth(self.preferred_screen)
            .ok_or_else(|| anyhow!("X11 screen {} is not available", self.preferred_screen))?;
        Ok((
            screen.root(),
            Rect::from_origin(
                0,
                0,
                screen.width_in_pixels() as u32,
                screen.height_in_pixels() as u32,
            ),
        ))
    }
}

impl DesktopApi for X11DesktopApi {
    #[instrument(skip(self))]
    fn get_idle_time(&mut self) -> Result<u32> {
        let (root, _) = self.root()?;
        let idle = self.connection.send_request(&QueryInfo {
            drawable: Drawable::Window(root),
        });
        let reply: QueryInfoReply = self.connection.wait_for_reply(idle)?;
        Ok(reply.ms_since_user_input())
    }

    #[instrument(skip(self))]
    fn get_foreground_geometry(&mut self) -> Result<Option<ForegroundGeometry>> {
        let (root, screen_rect) = self.root()?;
        let Some(active_window) =
            get_active_window(&self.connection, root, self.active_window_atom)?
        else {
            return Ok(None);
        };
        let window = get_window_rect(&self.connection, active_window, root)?;

        let monitors = get_monitor_rects(&self.connection, root).unwrap_or_else(|e| {
            debug!("RandR monitor query failed, using the whole screen {e:?}");
            Vec::new()
        });
        let monitor = nearest_monitor(&window, &monitors).unwrap_or(screen_rect);

        Ok(Some(ForegroundGeometry { window, monitor }))
    }
}
