//! Maps SDL2 scancodes to the browser-style key codes `Machine::handle_key`
//! expects, covering the same set the core's keyboard matrix table knows
//! about plus the four arrow keys and Ctrl it treats as a joystick.

use sdl2::keyboard::Scancode;

pub fn key_code(scancode: Scancode) -> Option<u32> {
    use Scancode::*;
    Some(match scancode {
        Backspace => 8,
        Return => 13,
        Escape => 27,
        Space => 32,
        Comma => 188,
        Period => 190,
        Slash => 191,
        Semicolon => 186,
        Equals => 187,
        Minus => 189,
        LShift | RShift => 16,
        LCtrl => 17,
        Left => 37,
        Up => 38,
        Right => 39,
        Down => 40,
        Num0 => 48,
        Num1 => 49,
        Num2 => 50,
        Num3 => 51,
        Num4 => 52,
        Num5 => 53,
        Num6 => 54,
        Num7 => 55,
        Num8 => 56,
        Num9 => 57,
        A => 65,
        B => 66,
        C => 67,
        D => 68,
        E => 69,
        F => 70,
        G => 71,
        H => 72,
        I => 73,
        J => 74,
        K => 75,
        L => 76,
        M => 77,
        N => 78,
        O => 79,
        P => 80,
        Q => 81,
        R => 82,
        S => 83,
        T => 84,
        U => 85,
        V => 86,
        W => 87,
        X => 88,
        Y => 89,
        Z => 90,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_and_ctrl_map_to_the_joystick_codes_the_core_expects() {
        assert_eq!(key_code(Scancode::Up), Some(38));
        assert_eq!(key_code(Scancode::Down), Some(40));
        assert_eq!(key_code(Scancode::Left), Some(37));
        assert_eq!(key_code(Scancode::Right), Some(39));
        assert_eq!(key_code(Scancode::LCtrl), Some(17));
    }

    #[test]
    fn unhandled_scancodes_return_none() {
        assert_eq!(key_code(Scancode::F13), None);
    }
}
